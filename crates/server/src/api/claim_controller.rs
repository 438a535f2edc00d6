use crate::{
    dtos::claim_dto::{ClaimNftRequest, ClaimStatusQuery},
    extractors::validation_extractor::{ValidatedQuery, ValidationExtractor},
    services::Services,
};
use axum::{routing::get, Extension, Json, Router};
use database::claim::model::ClaimStatus;
use utils::AppResult;

/// 领取 NFT
///
/// 校验钱包对领取消息的签名，通过后将 NFT 标记为 verified。
/// 签名相关的任何失败都返回同一个错误信息。
#[utoipa::path(
    post,
    path = "/api/v1/nft/claim",
    tag = "claim",
    request_body = ClaimNftRequest,
    responses(
        (status = 200, description = "签名校验通过", body = ClaimStatus),
        (status = 400, description = "地址格式错误或签名无效"),
        (status = 409, description = "NFT 已被领取或签名已使用")
    )
)]
pub async fn claim_nft(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<ClaimNftRequest>,
) -> AppResult<Json<ClaimStatus>> {
    let status = services.claim.claim_nft(req).await?;

    Ok(Json(status))
}

/// 查询领取状态
#[utoipa::path(
    get,
    path = "/api/v1/nft/claim",
    tag = "claim",
    params(ClaimStatusQuery),
    responses(
        (status = 200, description = "领取状态", body = ClaimStatus),
        (status = 404, description = "没有领取记录")
    )
)]
pub async fn get_claim_status(
    Extension(services): Extension<Services>,
    ValidatedQuery(query): ValidatedQuery<ClaimStatusQuery>,
) -> AppResult<Json<ClaimStatus>> {
    let status = services.claim.get_claim_status(&query.nft_address).await?;

    Ok(Json(status))
}

pub struct ClaimController;
impl ClaimController {
    pub fn app() -> Router {
        Router::new().route("/claim", get(get_claim_status).post(claim_nft))
    }
}
