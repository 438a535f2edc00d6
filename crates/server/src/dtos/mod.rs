pub mod claim_dto;
pub mod viral_dto;
