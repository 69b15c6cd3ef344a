use sqlx::SqlitePool;

use crate::models::play::{ComboStatus, PlaylogEntry, SyncStatus};
use crate::models::song::Difficulty;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_play;

// 游玩数据库的迁移步骤，按序执行。
// 每一步都以"效果已存在即跳过"的方式自我守卫，可在任意旧库上重复运行；
// 不维护版本号阶梯。
const PLAY_DB_MIGRATIONS: &[(&str, &str)] = &[
    (
        "plays",
        r#"
        CREATE TABLE IF NOT EXISTS plays (
            user_play_date INTEGER PRIMARY KEY NOT NULL,
            song_id        INTEGER NOT NULL,
            difficulty     INTEGER NOT NULL,

            score            INTEGER,
            dx_score         INTEGER,
            combo_status     INTEGER,
            sync_status      INTEGER,
            is_clear         INTEGER,
            is_new_record    INTEGER,
            is_dx_new_record INTEGER,
            track            INTEGER,
            matching_users   TEXT,

            max_combo   INTEGER,
            total_combo INTEGER,
            max_sync    INTEGER,
            total_sync  INTEGER,

            fast_count    INTEGER,
            late_count    INTEGER,
            before_rating INTEGER,
            after_rating  INTEGER,

            tap_critical_perfect INTEGER,
            tap_perfect          INTEGER,
            tap_great            INTEGER,
            tap_good             INTEGER,
            tap_miss             INTEGER,

            hold_critical_perfect INTEGER,
            hold_perfect          INTEGER,
            hold_great            INTEGER,
            hold_good             INTEGER,
            hold_miss             INTEGER,

            slide_critical_perfect INTEGER,
            slide_perfect          INTEGER,
            slide_great            INTEGER,
            slide_good             INTEGER,
            slide_miss             INTEGER,

            touch_critical_perfect INTEGER,
            touch_perfect          INTEGER,
            touch_great            INTEGER,
            touch_good             INTEGER,
            touch_miss             INTEGER,

            break_critical_perfect INTEGER,
            break_perfect          INTEGER,
            break_great            INTEGER,
            break_good             INTEGER,
            break_miss             INTEGER,

            total_critical_perfect INTEGER,
            total_perfect          INTEGER,
            total_great            INTEGER,
            total_good             INTEGER,
            total_miss             INTEGER
        )
        "#,
    ),
    (
        "dx_rating_gen_3",
        r#"
        CREATE TABLE IF NOT EXISTS dx_rating_gen_3 (
            user_play_date INTEGER PRIMARY KEY NOT NULL,
            internal_level INTEGER,
            rating         INTEGER,
            version        TEXT
        )
        "#,
    ),
];

/// 游玩记录存储。记录只追加不修改；以 `user_play_date` 为自然主键的
/// 幂等写入保证同一条记录从任意来源重复导入都只落库一次。
#[derive(Clone)]
pub struct PlayStore {
    pool: SqlitePool,
}

impl PlayStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // 按序应用迁移步骤，整体在一个事务内
    pub async fn init_tables(&self) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("开始事务失败: {e}")))?;

        for (name, sql) in PLAY_DB_MIGRATIONS {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("迁移步骤 {name} 失败: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("提交事务失败: {e}")))?;

        log::info!("游玩数据表初始化检查完成");
        Ok(())
    }

    /// 校验并写入一条游玩记录。
    /// 校验失败时整条拒绝、不落库；`user_play_date` 已存在时写入是
    /// 成功的空操作（已有数据为准，与曲库的语义一致）。
    pub async fn add_play(&self, play: &PlaylogEntry) -> AppResult<()> {
        validate_play(play)?;

        let matching_users_json = serde_json::to_string(&play.matching_users)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("开始事务失败: {e}")))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO plays (
                user_play_date, song_id, difficulty,

                score, dx_score, combo_status, sync_status,
                is_clear, is_new_record, is_dx_new_record,
                track, matching_users,

                max_combo, total_combo, max_sync, total_sync,

                fast_count, late_count, before_rating, after_rating,

                tap_critical_perfect, tap_perfect, tap_great,
                tap_good, tap_miss,

                hold_critical_perfect, hold_perfect, hold_great,
                hold_good, hold_miss,

                slide_critical_perfect, slide_perfect, slide_great,
                slide_good, slide_miss,

                touch_critical_perfect, touch_perfect, touch_great,
                touch_good, touch_miss,

                break_critical_perfect, break_perfect, break_great,
                break_good, break_miss,

                total_critical_perfect, total_perfect, total_great,
                total_good, total_miss
            ) VALUES (
                ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?
            )
            "#,
        )
        .bind(play.user_play_date)
        .bind(play.song_id)
        .bind(play.difficulty.as_i64())
        .bind(play.score)
        .bind(play.dx_score)
        .bind(play.combo_status.as_i64())
        .bind(play.sync_status.as_i64())
        .bind(play.is_clear as i64)
        .bind(play.is_new_record as i64)
        .bind(play.is_dx_new_record as i64)
        .bind(play.track)
        .bind(&matching_users_json)
        .bind(play.max_combo)
        .bind(play.total_combo)
        .bind(play.max_sync)
        .bind(play.total_sync)
        .bind(play.fast_count)
        .bind(play.late_count)
        .bind(play.before_rating)
        .bind(play.after_rating)
        .bind(play.tap_critical_perfect)
        .bind(play.tap_perfect)
        .bind(play.tap_great)
        .bind(play.tap_good)
        .bind(play.tap_miss)
        .bind(play.hold_critical_perfect)
        .bind(play.hold_perfect)
        .bind(play.hold_great)
        .bind(play.hold_good)
        .bind(play.hold_miss)
        .bind(play.slide_critical_perfect)
        .bind(play.slide_perfect)
        .bind(play.slide_great)
        .bind(play.slide_good)
        .bind(play.slide_miss)
        .bind(play.touch_critical_perfect)
        .bind(play.touch_perfect)
        .bind(play.touch_great)
        .bind(play.touch_good)
        .bind(play.touch_miss)
        .bind(play.break_critical_perfect)
        .bind(play.break_perfect)
        .bind(play.break_great)
        .bind(play.break_good)
        .bind(play.break_miss)
        .bind(play.total_critical_perfect)
        .bind(play.total_perfect)
        .bind(play.total_great)
        .bind(play.total_good)
        .bind(play.total_miss)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("写入游玩记录 {} 失败: {e}", play.user_play_date))
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("提交事务失败: {e}")))?;

        Ok(())
    }

    // 按自然主键查询单条记录
    pub async fn get_play(&self, date: i64) -> AppResult<PlaylogEntry> {
        let row = sqlx::query_as::<_, DbPlayRow>("SELECT * FROM plays WHERE user_play_date = ?")
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("查询游玩记录 {date} 失败: {e}")))?
            .ok_or(AppError::PlayNotFound(date))?;

        row.into_entry()
    }

    /// 按 `user_play_date` 排序的分页扫描。
    /// `ascending` 控制方向，`limit`/`offset` 为窗口；除排序与窗口外
    /// 不做任何过滤。
    pub async fn get_plays(
        &self,
        ascending: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<PlaylogEntry>> {
        let sql = if ascending {
            "SELECT * FROM plays ORDER BY user_play_date ASC LIMIT ? OFFSET ?"
        } else {
            "SELECT * FROM plays ORDER BY user_play_date DESC LIMIT ? OFFSET ?"
        };

        let rows = sqlx::query_as::<_, DbPlayRow>(sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("分页查询游玩记录失败: {e}")))?;

        rows.into_iter().map(DbPlayRow::into_entry).collect()
    }

    // 游玩记录总数
    pub async fn get_count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM plays")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("统计游玩记录数失败: {e}")))
    }

    /// 查询某谱面在指定日期之前（严格早于）的最高达成率。
    /// 没有符合条件的记录时返回 0，表示"此前没有成绩"。这是正常
    /// 结果而非错误，调用方不要与真实打出的 0 分混淆。
    pub async fn get_best_score_before_date(
        &self,
        song_id: i64,
        difficulty: Difficulty,
        date: i64,
    ) -> AppResult<i64> {
        let best: Option<i64> = sqlx::query_scalar(
            "SELECT score FROM plays
             WHERE song_id = ? AND difficulty = ? AND user_play_date < ?
             ORDER BY score DESC LIMIT 1",
        )
        .bind(song_id)
        .bind(difficulty.as_i64())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("查询历史最高成绩失败: {e}")))?;

        Ok(best.unwrap_or(0))
    }
}

// 数据库行模型，列顺序与 plays 表一致
#[derive(sqlx::FromRow)]
struct DbPlayRow {
    user_play_date: i64,
    song_id: i64,
    difficulty: i64,

    score: i64,
    dx_score: i64,
    combo_status: i64,
    sync_status: i64,
    is_clear: i64,
    is_new_record: i64,
    is_dx_new_record: i64,
    track: i64,
    matching_users: String,

    max_combo: i64,
    total_combo: i64,
    max_sync: i64,
    total_sync: i64,

    fast_count: i64,
    late_count: i64,
    before_rating: i64,
    after_rating: i64,

    tap_critical_perfect: i64,
    tap_perfect: i64,
    tap_great: i64,
    tap_good: i64,
    tap_miss: i64,

    hold_critical_perfect: i64,
    hold_perfect: i64,
    hold_great: i64,
    hold_good: i64,
    hold_miss: i64,

    slide_critical_perfect: i64,
    slide_perfect: i64,
    slide_great: i64,
    slide_good: i64,
    slide_miss: i64,

    touch_critical_perfect: i64,
    touch_perfect: i64,
    touch_great: i64,
    touch_good: i64,
    touch_miss: i64,

    break_critical_perfect: i64,
    break_perfect: i64,
    break_great: i64,
    break_good: i64,
    break_miss: i64,

    total_critical_perfect: i64,
    total_perfect: i64,
    total_great: i64,
    total_good: i64,
    total_miss: i64,
}

impl DbPlayRow {
    fn into_entry(self) -> AppResult<PlaylogEntry> {
        let matching_users: Vec<String> = serde_json::from_str(&self.matching_users)?;

        Ok(PlaylogEntry {
            user_play_date: self.user_play_date,
            song_id: self.song_id,
            difficulty: Difficulty::try_from(self.difficulty)?,
            score: self.score,
            dx_score: self.dx_score,
            combo_status: ComboStatus::try_from(self.combo_status)?,
            sync_status: SyncStatus::try_from(self.sync_status)?,
            is_clear: self.is_clear != 0,
            is_new_record: self.is_new_record != 0,
            is_dx_new_record: self.is_dx_new_record != 0,
            track: self.track,
            matching_users,

            max_combo: self.max_combo,
            total_combo: self.total_combo,
            max_sync: self.max_sync,
            total_sync: self.total_sync,

            fast_count: self.fast_count,
            late_count: self.late_count,
            before_rating: self.before_rating,
            after_rating: self.after_rating,

            tap_critical_perfect: self.tap_critical_perfect,
            tap_perfect: self.tap_perfect,
            tap_great: self.tap_great,
            tap_good: self.tap_good,
            tap_miss: self.tap_miss,

            hold_critical_perfect: self.hold_critical_perfect,
            hold_perfect: self.hold_perfect,
            hold_great: self.hold_great,
            hold_good: self.hold_good,
            hold_miss: self.hold_miss,

            slide_critical_perfect: self.slide_critical_perfect,
            slide_perfect: self.slide_perfect,
            slide_great: self.slide_great,
            slide_good: self.slide_good,
            slide_miss: self.slide_miss,

            touch_critical_perfect: self.touch_critical_perfect,
            touch_perfect: self.touch_perfect,
            touch_great: self.touch_great,
            touch_good: self.touch_good,
            touch_miss: self.touch_miss,

            break_critical_perfect: self.break_critical_perfect,
            break_perfect: self.break_perfect,
            break_great: self.break_great,
            break_good: self.break_good,
            break_miss: self.break_miss,

            total_critical_perfect: self.total_critical_perfect,
            total_perfect: self.total_perfect,
            total_great: self.total_great,
            total_good: self.total_good,
            total_miss: self.total_miss,
        })
    }
}
