use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::song::Difficulty;
use crate::utils::error::AppError;

// 连击成就状态（lamp）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ComboStatus {
    NoCombo,
    FullCombo,
    FullComboPlus,
    AllPerfect,
    AllPerfectPlus,
}

impl ComboStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            ComboStatus::NoCombo => 0,
            ComboStatus::FullCombo => 1,
            ComboStatus::FullComboPlus => 2,
            ComboStatus::AllPerfect => 3,
            ComboStatus::AllPerfectPlus => 4,
        }
    }
}

impl TryFrom<i64> for ComboStatus {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ComboStatus::NoCombo),
            1 => Ok(ComboStatus::FullCombo),
            2 => Ok(ComboStatus::FullComboPlus),
            3 => Ok(ComboStatus::AllPerfect),
            4 => Ok(ComboStatus::AllPerfectPlus),
            other => Err(AppError::DatabaseError(format!(
                "无效的连击状态编码: {other}"
            ))),
        }
    }
}

// 多人同步成就状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SyncStatus {
    NoSync,
    FullSync,
    FullSyncPlus,
    FullSyncDx,
    FullSyncDxPlus,
}

impl SyncStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            SyncStatus::NoSync => 0,
            SyncStatus::FullSync => 1,
            SyncStatus::FullSyncPlus => 2,
            SyncStatus::FullSyncDx => 3,
            SyncStatus::FullSyncDxPlus => 4,
        }
    }
}

impl TryFrom<i64> for SyncStatus {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SyncStatus::NoSync),
            1 => Ok(SyncStatus::FullSync),
            2 => Ok(SyncStatus::FullSyncPlus),
            3 => Ok(SyncStatus::FullSyncDx),
            4 => Ok(SyncStatus::FullSyncDxPlus),
            other => Err(AppError::DatabaseError(format!(
                "无效的同步状态编码: {other}"
            ))),
        }
    }
}

/// 一条游玩记录，与 `plays` 表一一对应。
///
/// 自然主键为 `user_play_date`（Unix 秒），同一玩家的游玩时间视为唯一。
/// 记录一经写入不再修改；重复写入同一时间的记录是幂等的空操作。
///
/// 五档判定（Critical Perfect / Perfect / Great / Good / Miss）各自
/// 按音符类型（tap/hold/slide/touch/break）细分计数，另带总数字段；
/// 细分与总数的一致性由 `validate_play` 在入库前检查。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlaylogEntry {
    pub user_play_date: i64,

    pub song_id: i64,
    pub difficulty: Difficulty,
    pub score: i64,
    pub dx_score: i64,
    pub combo_status: ComboStatus,
    pub sync_status: SyncStatus,
    pub is_clear: bool,
    pub is_new_record: bool,
    pub is_dx_new_record: bool,
    pub track: i64,
    pub matching_users: Vec<String>,

    pub max_combo: i64,
    pub total_combo: i64,
    pub max_sync: i64,
    pub total_sync: i64,

    pub fast_count: i64,
    pub late_count: i64,
    pub before_rating: i64,
    pub after_rating: i64,

    pub tap_critical_perfect: i64,
    pub tap_perfect: i64,
    pub tap_great: i64,
    pub tap_good: i64,
    pub tap_miss: i64,

    pub hold_critical_perfect: i64,
    pub hold_perfect: i64,
    pub hold_great: i64,
    pub hold_good: i64,
    pub hold_miss: i64,

    pub slide_critical_perfect: i64,
    pub slide_perfect: i64,
    pub slide_great: i64,
    pub slide_good: i64,
    pub slide_miss: i64,

    pub touch_critical_perfect: i64,
    pub touch_perfect: i64,
    pub touch_great: i64,
    pub touch_good: i64,
    pub touch_miss: i64,

    pub break_critical_perfect: i64,
    pub break_perfect: i64,
    pub break_great: i64,
    pub break_good: i64,
    pub break_miss: i64,

    pub total_critical_perfect: i64,
    pub total_perfect: i64,
    pub total_great: i64,
    pub total_good: i64,
    pub total_miss: i64,
}
