use crate::models::play::PlaylogEntry;
use crate::utils::error::{AppError, AppResult};

/// 入库前的结构校验：五档判定各自的音符类型细分之和必须与总数一致。
/// 细分全为 0 时视为数据源未提供细分，直接信任总数、跳过该档。
/// 发现第一个不一致即返回，不聚合多处错误。
pub fn validate_play(play: &PlaylogEntry) -> AppResult<()> {
    let tiers: [(&str, [i64; 5], i64); 5] = [
        (
            "Critical Perfect",
            [
                play.tap_critical_perfect,
                play.hold_critical_perfect,
                play.slide_critical_perfect,
                play.touch_critical_perfect,
                play.break_critical_perfect,
            ],
            play.total_critical_perfect,
        ),
        (
            "Perfect",
            [
                play.tap_perfect,
                play.hold_perfect,
                play.slide_perfect,
                play.touch_perfect,
                play.break_perfect,
            ],
            play.total_perfect,
        ),
        (
            "Great",
            [
                play.tap_great,
                play.hold_great,
                play.slide_great,
                play.touch_great,
                play.break_great,
            ],
            play.total_great,
        ),
        (
            "Good",
            [
                play.tap_good,
                play.hold_good,
                play.slide_good,
                play.touch_good,
                play.break_good,
            ],
            play.total_good,
        ),
        (
            "Miss",
            [
                play.tap_miss,
                play.hold_miss,
                play.slide_miss,
                play.touch_miss,
                play.break_miss,
            ],
            play.total_miss,
        ),
    ];

    for (name, counts, total) in tiers {
        let sum: i64 = counts.iter().sum();
        if sum != 0 && sum != total {
            return Err(AppError::ValidationError(format!(
                "游玩记录 {} 的 {name} 细分之和 ({sum}) 与总数 ({total}) 不一致",
                play.user_play_date
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::play::{ComboStatus, SyncStatus};
    use crate::models::song::Difficulty;

    fn sample_play() -> PlaylogEntry {
        PlaylogEntry {
            user_play_date: 1743108003,
            song_id: 11441,
            difficulty: Difficulty::Master,

            score: 971017,
            dx_score: 1841,
            combo_status: ComboStatus::NoCombo,
            sync_status: SyncStatus::NoSync,
            is_clear: true,
            is_new_record: true,
            is_dx_new_record: true,
            track: 3,
            matching_users: vec!["ＳＵＰＡＩＤＯＬ".to_string()],

            max_combo: 385,
            total_combo: 783,
            max_sync: 559,
            total_sync: 1566,

            fast_count: 53,
            late_count: 66,
            before_rating: 13085,
            after_rating: 13085,

            tap_critical_perfect: 222,
            tap_perfect: 239,
            tap_great: 67,
            tap_good: 8,
            tap_miss: 3,

            hold_critical_perfect: 44,
            hold_perfect: 27,
            hold_great: 6,
            hold_good: 1,
            hold_miss: 1,

            slide_critical_perfect: 93,
            slide_perfect: 0,
            slide_great: 3,
            slide_good: 3,
            slide_miss: 0,

            touch_critical_perfect: 19,
            touch_perfect: 0,
            touch_great: 0,
            touch_good: 0,
            touch_miss: 1,

            break_critical_perfect: 15,
            break_perfect: 24,
            break_great: 6,
            break_good: 1,
            break_miss: 0,

            total_critical_perfect: 393,
            total_perfect: 290,
            total_great: 82,
            total_good: 13,
            total_miss: 5,
        }
    }

    #[test]
    fn test_valid_play() {
        assert!(validate_play(&sample_play()).is_ok());
    }

    #[test]
    fn test_each_tier_detected() {
        // 依次篡改五档总数，逐一确认被拒绝且错误指明对应档位
        let tamper: [(fn(&mut PlaylogEntry), &str); 5] = [
            (|p| p.total_critical_perfect += 1, "Critical Perfect"),
            (|p| p.total_perfect += 1, "Perfect"),
            (|p| p.total_great += 1, "Great"),
            (|p| p.total_good += 1, "Good"),
            (|p| p.total_miss += 1, "Miss"),
        ];

        for (mutate, tier) in tamper {
            let mut play = sample_play();
            mutate(&mut play);
            match validate_play(&play) {
                Err(AppError::ValidationError(msg)) => {
                    assert!(msg.contains(tier), "错误信息未包含档位 {tier}: {msg}");
                    assert!(msg.contains("1743108003"));
                }
                other => panic!("期望 ValidationError, 实际 {other:?}"),
            }
        }
    }

    #[test]
    fn test_no_detailed_judgement_accepted() {
        // 数据源未提供细分时（全 0），仅带总数的记录应被接受
        let mut play = sample_play();
        play.tap_critical_perfect = 0;
        play.hold_critical_perfect = 0;
        play.slide_critical_perfect = 0;
        play.touch_critical_perfect = 0;
        play.break_critical_perfect = 0;
        play.tap_perfect = 0;
        play.hold_perfect = 0;
        play.slide_perfect = 0;
        play.touch_perfect = 0;
        play.break_perfect = 0;
        play.tap_great = 0;
        play.hold_great = 0;
        play.slide_great = 0;
        play.touch_great = 0;
        play.break_great = 0;
        play.tap_good = 0;
        play.hold_good = 0;
        play.slide_good = 0;
        play.touch_good = 0;
        play.break_good = 0;
        play.tap_miss = 0;
        play.hold_miss = 0;
        play.slide_miss = 0;
        play.touch_miss = 0;
        play.break_miss = 0;

        assert!(validate_play(&play).is_ok());
    }
}
