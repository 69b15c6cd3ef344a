use sqlx::SqlitePool;

use crate::models::song::Difficulty;
use crate::services::song_store::SongStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::rating::dx_rating_gen3;

/// 第三代 DX Rating 的派生缓存，落在游玩数据库的 `dx_rating_gen_3` 表。
///
/// 惰性物化视图：查询时才把尚未计算过的游玩记录逐条补齐。
/// 行一经写入不再更新，定数取的是计算时刻的快照，曲库之后的修订
/// 不会回溯。并发补齐时先写者生效，后写者是幂等空操作；重复计算
/// 只浪费工时，不影响正确性（评分函数是纯函数）。
#[derive(Clone)]
pub struct RatingCache {
    pool: SqlitePool,
}

// 补齐时从 plays 表取出的最小字段集
#[derive(sqlx::FromRow)]
struct UncachedPlay {
    user_play_date: i64,
    song_id: i64,
    difficulty: i64,
    score: i64,
}

impl RatingCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 查询某次游玩的 DX Rating，必要时先把缓存补齐到包含该记录。
    /// 补齐后仍不存在说明该日期没有对应的游玩记录。
    pub async fn get_rating(&self, date: i64, songs: &SongStore) -> AppResult<i64> {
        self.populate(songs).await?;

        sqlx::query_scalar::<_, i64>("SELECT rating FROM dx_rating_gen_3 WHERE user_play_date = ?")
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("查询 Rating 缓存失败: {e}")))?
            .ok_or(AppError::PlayNotFound(date))
    }

    /// 逐条补齐缓存：每轮取一条未计算的游玩记录，从曲库解析其谱面、
    /// 计算 Rating 后幂等写入，直到没有未计算的记录为止。
    /// 谱面在曲库中缺失是硬性的数据不一致，直接报错、不重试；
    /// 曲库不补全，重试不可能成功。
    pub async fn populate(&self, songs: &SongStore) -> AppResult<()> {
        loop {
            let uncached = sqlx::query_as::<_, UncachedPlay>(
                "SELECT user_play_date, song_id, difficulty, score FROM plays
                 WHERE user_play_date NOT IN (SELECT user_play_date FROM dx_rating_gen_3)
                 LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("查询未计算的游玩记录失败: {e}")))?;

            let Some(play) = uncached else {
                break;
            };

            let song = songs.get_song(play.song_id).await?;
            let difficulty = Difficulty::try_from(play.difficulty)?;

            // 把命中的谱面拷贝出来再用，不保留对循环局部量的引用
            let chart = song
                .charts
                .iter()
                .find(|c| c.difficulty == difficulty)
                .cloned()
                .ok_or_else(|| {
                    AppError::ChartNotFound(format!(
                        "歌曲 {} 没有难度 {:?} 的谱面，无法为游玩记录 {} 计算 Rating",
                        play.song_id, difficulty, play.user_play_date
                    ))
                })?;

            let rating = dx_rating_gen3(play.score, chart.internal_level);

            sqlx::query(
                "INSERT OR IGNORE INTO dx_rating_gen_3
                 (user_play_date, internal_level, rating, version)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(play.user_play_date)
            .bind(chart.internal_level)
            .bind(rating)
            .bind(&song.version)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "写入游玩记录 {} 的 Rating 缓存失败: {e}",
                    play.user_play_date
                ))
            })?;

            log::debug!(
                "游玩记录 {} 的 Rating 已计算: {rating}",
                play.user_play_date
            );
        }

        Ok(())
    }

    // 已缓存的 Rating 行数
    pub async fn get_count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM dx_rating_gen_3")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("统计 Rating 缓存数失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::play::{ComboStatus, PlaylogEntry, SyncStatus};
    use crate::models::song::{ChartInfo, SongInfo};
    use crate::services::play_store::PlayStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database")
    }

    async fn setup() -> (PlayStore, SongStore, RatingCache) {
        let play_pool = memory_pool().await;
        let song_pool = memory_pool().await;

        let play_store = PlayStore::new(play_pool.clone());
        play_store.init_tables().await.expect("init plays failed");
        let song_store = SongStore::new(song_pool);
        song_store.init_tables().await.expect("init songs failed");
        let cache = RatingCache::new(play_pool);

        (play_store, song_store, cache)
    }

    fn make_song(song_id: i64, internal_level: i64, version: &str) -> SongInfo {
        SongInfo {
            song_id,
            name: format!("song {song_id}"),
            artist: "artist".to_string(),
            song_type: "dx".to_string(),
            bpm: 150,
            category: "niconico＆ボーカロイド".to_string(),
            version: version.to_string(),
            sort: "100000".to_string(),
            charts: vec![ChartInfo {
                difficulty: Difficulty::Master,
                level: internal_level / 10,
                internal_level,
                notes_designer: "-".to_string(),
                max_notes: 700,
            }],
        }
    }

    fn make_play(date: i64, song_id: i64, difficulty: Difficulty, score: i64) -> PlaylogEntry {
        PlaylogEntry {
            user_play_date: date,
            song_id,
            difficulty,
            score,
            dx_score: 0,
            combo_status: ComboStatus::NoCombo,
            sync_status: SyncStatus::NoSync,
            is_clear: true,
            is_new_record: false,
            is_dx_new_record: false,
            track: 1,
            matching_users: vec![],
            max_combo: 0,
            total_combo: 0,
            max_sync: 0,
            total_sync: 0,
            fast_count: 0,
            late_count: 0,
            before_rating: 0,
            after_rating: 0,
            tap_critical_perfect: 0,
            tap_perfect: 0,
            tap_great: 0,
            tap_good: 0,
            tap_miss: 0,
            hold_critical_perfect: 0,
            hold_perfect: 0,
            hold_great: 0,
            hold_good: 0,
            hold_miss: 0,
            slide_critical_perfect: 0,
            slide_perfect: 0,
            slide_great: 0,
            slide_good: 0,
            slide_miss: 0,
            touch_critical_perfect: 0,
            touch_perfect: 0,
            touch_great: 0,
            touch_good: 0,
            touch_miss: 0,
            break_critical_perfect: 0,
            break_perfect: 0,
            break_great: 0,
            break_good: 0,
            break_miss: 0,
            total_critical_perfect: 400,
            total_perfect: 200,
            total_great: 50,
            total_good: 10,
            total_miss: 5,
        }
    }

    #[tokio::test]
    async fn test_populate_and_get_rating() {
        let (play_store, song_store, cache) = setup().await;

        song_store
            .add_song(&make_song(11441, 133, "BUDDiES"))
            .await
            .expect("add_song failed");
        song_store
            .add_song(&make_song(11500, 126, "FESTiVAL"))
            .await
            .expect("add_song failed");

        play_store
            .add_play(&make_play(1743108003, 11441, Difficulty::Master, 1000470))
            .await
            .expect("add_play failed");
        play_store
            .add_play(&make_play(1743109338, 11500, Difficulty::Master, 1001379))
            .await
            .expect("add_play failed");

        // 首次查询触发对全部未计算记录的补齐
        let rating = cache
            .get_rating(1743108003, &song_store)
            .await
            .expect("get_rating failed");
        assert_eq!(rating, 287);
        assert_eq!(cache.get_count().await.expect("count failed"), 2);

        let rating2 = cache
            .get_rating(1743109338, &song_store)
            .await
            .expect("get_rating failed");
        assert_eq!(rating2, 272);

        // 缓存行是计算时刻的快照：定数与版本一同入库
        let (internal_level, version): (i64, String) = sqlx::query_as(
            "SELECT internal_level, version FROM dx_rating_gen_3 WHERE user_play_date = ?",
        )
        .bind(1743108003_i64)
        .fetch_one(&cache.pool)
        .await
        .expect("row query failed");
        assert_eq!(internal_level, 133);
        assert_eq!(version, "BUDDiES");

        // 再次查询不会重复计算，结果不变
        let again = cache
            .get_rating(1743108003, &song_store)
            .await
            .expect("get_rating failed");
        assert_eq!(again, 287);
        assert_eq!(cache.get_count().await.expect("count failed"), 2);
    }

    #[tokio::test]
    async fn test_rating_for_unknown_date() {
        let (_play_store, song_store, cache) = setup().await;

        match cache.get_rating(424242, &song_store).await {
            Err(AppError::PlayNotFound(424242)) => {}
            other => panic!("期望 PlayNotFound, 实际 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_chart_is_consistency_error() {
        let (play_store, song_store, cache) = setup().await;

        // 曲库只有 Master 谱面，游玩记录却指向 Expert
        song_store
            .add_song(&make_song(11441, 133, "BUDDiES"))
            .await
            .expect("add_song failed");
        play_store
            .add_play(&make_play(1743108003, 11441, Difficulty::Expert, 990000))
            .await
            .expect("add_play failed");

        match cache.get_rating(1743108003, &song_store).await {
            Err(AppError::ChartNotFound(_)) => {}
            other => panic!("期望 ChartNotFound, 实际 {other:?}"),
        }
    }
}
