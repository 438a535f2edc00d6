use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SOLspace Backend API",
        description = "爆款帖子分级与 NFT 领取签名校验 API 文档",
        version = "0.1.0"
    ),
    paths(
        // System health check
        crate::api::health,
        // Claim endpoints
        crate::api::claim_controller::claim_nft,
        crate::api::claim_controller::get_claim_status,
        // Viral endpoints
        crate::api::viral_controller::evaluate,
        crate::api::viral_controller::list_posts,
        crate::api::viral_controller::status,
    ),
    components(
        schemas(
            // Claim DTOs
            crate::dtos::claim_dto::ClaimNftRequest,
            crate::dtos::claim_dto::SignatureProofDto,
            database::claim::model::ClaimStatus,
            database::claim::model::ClaimState,
            // Viral DTOs
            crate::dtos::viral_dto::EvaluateMetricsRequest,
            crate::dtos::viral_dto::EvaluateMetricsResponse,
            crate::dtos::viral_dto::ViralStatusResponse,
            crate::dtos::viral_dto::ApiLimitStatusDto,
            database::viral_post::model::ViralPost,
        )
    ),
    tags(
        (name = "系统状态", description = "系统健康检查和状态监控"),
        (name = "claim", description = "NFT 领取与钱包签名校验"),
        (name = "viral", description = "爆款帖子分级与监控")
    )
)]
pub struct ApiDoc;
