use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::play::PlaylogEntry;
use crate::models::song::SongInfo;

// 统一的 API 响应包装
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u32,
    pub status: String,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            status: "ok".to_string(),
            message: None,
            data: Some(data),
        }
    }
}

/// 游玩记录与对应歌曲信息的组合，供分页接口返回。
/// 曲库缺失该歌曲时 `song` 为 null，由前端自行处理。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayWithSong {
    pub play: PlaylogEntry,
    pub song: Option<SongInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingResponse {
    pub user_play_date: i64,
    pub rating: i64,
}
