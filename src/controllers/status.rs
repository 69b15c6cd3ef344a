use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ApiResponse;
use crate::services::play_store::PlayStore;
use crate::services::rating_cache::RatingCache;
use crate::utils::error::AppResult;

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    // 已存储的游玩记录数
    pub play_count: i64,
    // 已计算的 Rating 缓存行数
    pub rating_count: i64,
}

/// 返回存储层的概况统计。
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "存储层统计", body = StatusResponse)
    )
)]
#[get("/status")]
pub async fn get_status(
    play_store: web::Data<PlayStore>,
    rating_cache: web::Data<RatingCache>,
) -> AppResult<HttpResponse> {
    let play_count = play_store.get_count().await?;
    let rating_count = rating_cache.get_count().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(StatusResponse {
        play_count,
        rating_count,
    })))
}
