use sqlx::SqlitePool;

use crate::models::song::{ChartInfo, Difficulty, SongInfo};
use crate::utils::error::{AppError, AppResult};

// 曲库存储，管理 songs / charts 两张表。
// 参考数据只增不改：写入一律 INSERT OR IGNORE，已有行始终优先。
#[derive(Clone)]
pub struct SongStore {
    pool: SqlitePool,
}

impl SongStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // 幂等建表，进程启动时调用
    pub async fn init_tables(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                song_id  INTEGER PRIMARY KEY NOT NULL,
                name     TEXT,
                artist   TEXT,
                type     TEXT,
                bpm      INTEGER,
                category TEXT,
                version  TEXT,
                sort     TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("创建 songs 表失败: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS charts (
                song_id        INTEGER NOT NULL,
                difficulty     INTEGER NOT NULL,
                level          INTEGER,
                internal_level INTEGER,
                notes_designer TEXT,
                max_notes      INTEGER,
                PRIMARY KEY (song_id, difficulty)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("创建 charts 表失败: {e}")))?;

        log::info!("曲库数据表初始化检查完成");
        Ok(())
    }

    /// 写入一首歌曲及其全部谱面，单个事务内完成。
    /// 歌曲或谱面行已存在时静默跳过（不是覆盖），重复导入是空操作。
    pub async fn add_song(&self, song: &SongInfo) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("开始事务失败: {e}")))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO songs (
                song_id, name, artist, type,
                bpm, category, version, sort
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(song.song_id)
        .bind(&song.name)
        .bind(&song.artist)
        .bind(&song.song_type)
        .bind(song.bpm)
        .bind(&song.category)
        .bind(&song.version)
        .bind(&song.sort)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("写入歌曲 {} 失败: {e}", song.song_id)))?;

        for chart in &song.charts {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO charts (
                    song_id, difficulty, level,
                    internal_level, notes_designer, max_notes
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(song.song_id)
            .bind(chart.difficulty.as_i64())
            .bind(chart.level)
            .bind(chart.internal_level)
            .bind(&chart.notes_designer)
            .bind(chart.max_notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("写入歌曲 {} 的谱面失败: {e}", song.song_id))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("提交事务失败: {e}")))?;

        Ok(())
    }

    /// 按 ID 查询歌曲，附带其全部谱面。
    /// 歌曲行不存在返回 `SongNotFound`；歌曲存在但没有任何谱面
    /// 视为曲库数据不完整，返回 `ChartNotFound`（与"没有这首歌"可区分）。
    pub async fn get_song(&self, song_id: i64) -> AppResult<SongInfo> {
        let row = sqlx::query_as::<_, DbSongRow>(
            "SELECT song_id, name, artist, type, bpm, category, version, sort
             FROM songs WHERE song_id = ?",
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("查询歌曲 {song_id} 失败: {e}")))?
        .ok_or(AppError::SongNotFound(song_id))?;

        self.attach_charts(row).await
    }

    /// 按名称精确匹配查询。同名歌曲（std/dx 两个谱面变体，或确实同名的
    /// 不同曲目）会返回多条；无匹配时返回空集合而非错误。
    pub async fn get_songs_by_name(&self, name: &str) -> AppResult<Vec<SongInfo>> {
        let rows = sqlx::query_as::<_, DbSongRow>(
            "SELECT song_id, name, artist, type, bpm, category, version, sort
             FROM songs WHERE name = ?",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("按名称查询歌曲失败: {e}")))?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push(self.attach_charts(row).await?);
        }
        Ok(songs)
    }

    // 按版本标签查询，忽略大小写的精确匹配
    pub async fn get_songs_by_version(&self, version: &str) -> AppResult<Vec<SongInfo>> {
        let rows = sqlx::query_as::<_, DbSongRow>(
            "SELECT song_id, name, artist, type, bpm, category, version, sort
             FROM songs WHERE LOWER(version) = LOWER(?)",
        )
        .bind(version)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("按版本查询歌曲失败: {e}")))?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push(self.attach_charts(row).await?);
        }
        Ok(songs)
    }

    // 读出歌曲的谱面列表并组装成 SongInfo
    async fn attach_charts(&self, row: DbSongRow) -> AppResult<SongInfo> {
        let chart_rows = sqlx::query_as::<_, DbChartRow>(
            "SELECT difficulty, level, internal_level, notes_designer, max_notes
             FROM charts WHERE song_id = ? ORDER BY difficulty ASC",
        )
        .bind(row.song_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("查询歌曲 {} 的谱面失败: {e}", row.song_id)))?;

        if chart_rows.is_empty() {
            return Err(AppError::ChartNotFound(format!(
                "歌曲 {} 在曲库中没有任何谱面记录",
                row.song_id
            )));
        }

        let mut charts = Vec::with_capacity(chart_rows.len());
        for chart_row in chart_rows {
            charts.push(ChartInfo {
                difficulty: Difficulty::try_from(chart_row.difficulty)?,
                level: chart_row.level,
                internal_level: chart_row.internal_level,
                notes_designer: chart_row.notes_designer,
                max_notes: chart_row.max_notes,
            });
        }

        Ok(SongInfo {
            song_id: row.song_id,
            name: row.name,
            artist: row.artist,
            song_type: row.song_type,
            bpm: row.bpm,
            category: row.category,
            version: row.version,
            sort: row.sort,
            charts,
        })
    }
}

// 数据库行模型，仅用于查询结果映射
#[derive(sqlx::FromRow)]
struct DbSongRow {
    song_id: i64,
    name: String,
    artist: String,
    #[sqlx(rename = "type")]
    song_type: String,
    bpm: i64,
    category: String,
    version: String,
    sort: String,
}

#[derive(sqlx::FromRow)]
struct DbChartRow {
    difficulty: i64,
    level: i64,
    internal_level: i64,
    notes_designer: String,
    max_notes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SongStore {
        // 单连接，保证内存库在各语句间共享
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        let store = SongStore::new(pool);
        store.init_tables().await.expect("Failed to init tables");
        store
    }

    fn sample_song() -> SongInfo {
        SongInfo {
            song_id: 11441,
            name: "終焉逃避行".to_string(),
            artist: "月鈴 那知".to_string(),
            song_type: "dx".to_string(),
            bpm: 185,
            category: "POPS＆アニメ".to_string(),
            version: "BUDDiES".to_string(),
            sort: "110000".to_string(),
            charts: vec![
                ChartInfo {
                    difficulty: Difficulty::Expert,
                    level: 12,
                    internal_level: 122,
                    notes_designer: "はっぴー".to_string(),
                    max_notes: 611,
                },
                ChartInfo {
                    difficulty: Difficulty::Master,
                    level: 13,
                    internal_level: 133,
                    notes_designer: "はっぴー".to_string(),
                    max_notes: 783,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_add_and_get_song() {
        let store = memory_store().await;
        let song = sample_song();

        store.add_song(&song).await.expect("add_song failed");

        let got = store.get_song(11441).await.expect("get_song failed");
        assert_eq!(song, got);

        match store.get_song(2).await {
            Err(AppError::SongNotFound(2)) => {}
            other => panic!("期望 SongNotFound(2), 实际 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_song_is_idempotent() {
        let store = memory_store().await;
        let song = sample_song();

        store.add_song(&song).await.expect("first add failed");

        // 第二次写入同一首歌（字段被改动过）不报错，且已有数据保持不变
        let mut altered = song.clone();
        altered.artist = "someone else".to_string();
        altered.charts[0].internal_level = 999;
        store.add_song(&altered).await.expect("second add failed");

        let got = store.get_song(11441).await.expect("get_song failed");
        assert_eq!(song, got);
    }

    #[tokio::test]
    async fn test_get_songs_by_name() {
        let store = memory_store().await;

        // 同名歌曲的 std / dx 两个变体
        let mut std_song = sample_song();
        std_song.song_id = 188;
        std_song.name = "天ノ弱".to_string();
        std_song.song_type = "std".to_string();
        let mut dx_song = sample_song();
        dx_song.song_id = 10188;
        dx_song.name = "天ノ弱".to_string();
        dx_song.song_type = "dx".to_string();

        store.add_song(&std_song).await.expect("add failed");
        store.add_song(&dx_song).await.expect("add failed");
        store.add_song(&sample_song()).await.expect("add failed");

        let songs = store
            .get_songs_by_name("天ノ弱")
            .await
            .expect("by_name failed");
        assert_eq!(songs.len(), 2);
        for song in &songs {
            assert!(song.song_id == 188 || song.song_id == 10188);
        }

        let none = store
            .get_songs_by_name("i went to ur mom's house")
            .await
            .expect("by_name failed");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_get_songs_by_version_case_insensitive() {
        let store = memory_store().await;
        store.add_song(&sample_song()).await.expect("add failed");

        let songs = store
            .get_songs_by_version("buddies")
            .await
            .expect("by_version failed");
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song_id, 11441);

        let none = store
            .get_songs_by_version("FESTiVAL")
            .await
            .expect("by_version failed");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_song_without_charts_is_inconsistent() {
        let store = memory_store().await;

        // 手工插入一条没有谱面的歌曲行，模拟不完整的曲库数据
        sqlx::query(
            "INSERT INTO songs (song_id, name, artist, type, bpm, category, version, sort)
             VALUES (7, 'x', 'y', 'std', 120, 'c', 'v', 's')",
        )
        .execute(&store.pool)
        .await
        .expect("raw insert failed");

        match store.get_song(7).await {
            Err(AppError::ChartNotFound(_)) => {}
            other => panic!("期望 ChartNotFound, 实际 {other:?}"),
        }
    }
}
