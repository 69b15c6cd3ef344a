use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::error::AppError;

// 谱面难度，数据库中以整数存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Difficulty {
    Basic,
    Advanced,
    Expert,
    Master,
    ReMaster,
    Utage,
}

impl Difficulty {
    pub fn as_i64(self) -> i64 {
        match self {
            Difficulty::Basic => 0,
            Difficulty::Advanced => 1,
            Difficulty::Expert => 2,
            Difficulty::Master => 3,
            Difficulty::ReMaster => 4,
            Difficulty::Utage => 5,
        }
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Difficulty::Basic),
            1 => Ok(Difficulty::Advanced),
            2 => Ok(Difficulty::Expert),
            3 => Ok(Difficulty::Master),
            4 => Ok(Difficulty::ReMaster),
            5 => Ok(Difficulty::Utage),
            other => Err(AppError::DatabaseError(format!("无效的难度编码: {other}"))),
        }
    }
}

/// 歌曲信息，包含其所有谱面。
///
/// `song_id` 由上游数据源分配，固定不变；同名歌曲可能以不同的
/// `song_type`（std/dx）同时存在。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SongInfo {
    pub song_id: i64,
    pub name: String,
    pub artist: String,
    #[serde(rename = "type")]
    pub song_type: String,
    pub bpm: i64,
    pub category: String,
    pub version: String,
    pub sort: String,
    pub charts: Vec<ChartInfo>,
}

/// 单个谱面。`internal_level` 为定数×10 的定点整数，避免浮点误差。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartInfo {
    pub difficulty: Difficulty,
    pub level: i64,
    pub internal_level: i64,
    pub notes_designer: String,
    pub max_notes: i64,
}
