use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::models::play::{ComboStatus, PlaylogEntry, SyncStatus};
use crate::models::song::{ChartInfo, Difficulty};
use crate::services::play_store::PlayStore;
use crate::services::song_store::SongStore;
use crate::utils::error::{AppError, AppResult};

// kamai.tachi.ac API 相关的常量
const API_URL: &str = "https://kamai.tachi.ac/api/v1";

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    success: bool,
    body: ActivityBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityBody {
    #[serde(default)]
    recent_sessions: Vec<SessionData>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    #[serde(rename = "scoreIDs", default)]
    score_ids: Vec<String>,
    #[serde(rename = "timeStarted")]
    time_started: i64,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    success: bool,
    body: ScoreBody,
}

#[derive(Debug, Deserialize)]
struct ScoreBody {
    score: ScoreData,
    song: SongData,
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreData {
    // Unix 毫秒
    time_achieved: i64,
    score_data: ScoreValues,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ScoreValues {
    percent: f64,
    lamp: String,
    judgements: Judgements,
    optional: OptionalMetrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Judgements {
    pcrit: i64,
    perfect: i64,
    great: i64,
    good: i64,
    miss: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OptionalMetrics {
    fast: i64,
    slow: i64,
    max_combo: i64,
}

#[derive(Debug, Deserialize)]
struct SongData {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartData {
    difficulty: String,
}

// kamai 的难度名带 "DX " 前缀区分 std/dx 谱面变体，
// 与曲库里的 type 字段对应
fn kamai_difficulty(difficulty: &str) -> AppResult<(Difficulty, &'static str)> {
    let (tier, song_type) = match difficulty.strip_prefix("DX ") {
        Some(rest) => (rest, "dx"),
        None => (difficulty, "std"),
    };

    let tier = match tier {
        "Basic" => Difficulty::Basic,
        "Advanced" => Difficulty::Advanced,
        "Expert" => Difficulty::Expert,
        "Master" => Difficulty::Master,
        "Re:Master" => Difficulty::ReMaster,
        other => {
            return Err(AppError::UpstreamError(format!(
                "无效的 kamai 难度名: {other}"
            )))
        }
    };

    Ok((tier, song_type))
}

fn lamp_to_combo_status(lamp: &str) -> AppResult<ComboStatus> {
    match lamp {
        "FAILED" | "CLEAR" => Ok(ComboStatus::NoCombo),
        "FULL COMBO" => Ok(ComboStatus::FullCombo),
        "FULL COMBO+" => Ok(ComboStatus::FullComboPlus),
        "ALL PERFECT" => Ok(ComboStatus::AllPerfect),
        "ALL PERFECT+" => Ok(ComboStatus::AllPerfectPlus),
        other => Err(AppError::UpstreamError(format!("无效的 lamp: {other}"))),
    }
}

/// 在曲库中定位 kamai 成绩对应的谱面：按标题查歌，再按 std/dx 变体
/// 与难度筛选。命中的歌曲 ID 与谱面拷贝出来返回，不保留对候选列表的
/// 引用。找不到是曲库缺数据的硬性不一致，调用方不应重试。
async fn resolve_chart(
    songs: &SongStore,
    title: &str,
    difficulty: Difficulty,
    song_type: &str,
) -> AppResult<(i64, ChartInfo)> {
    let candidates = songs.get_songs_by_name(title).await?;

    let mut matched: Option<(i64, ChartInfo)> = None;
    for song in &candidates {
        if song.song_type != song_type {
            continue;
        }
        for chart in &song.charts {
            if chart.difficulty == difficulty {
                matched = Some((song.song_id, chart.clone()));
            }
        }
    }

    matched.ok_or_else(|| {
        AppError::ChartNotFound(format!(
            "曲库中找不到 '{title}' ({song_type}) 的 {difficulty:?} 谱面"
        ))
    })
}

// kamai 只下发五档总数，不带音符类型细分；细分全 0 时
// 入库校验会直接信任总数。
fn score_to_entry(body: &ScoreBody, song_id: i64, difficulty: Difficulty) -> AppResult<PlaylogEntry> {
    let values = &body.score.score_data;
    let combo_status = lamp_to_combo_status(&values.lamp)?;

    Ok(PlaylogEntry {
        user_play_date: body.score.time_achieved / 1000,
        song_id,
        difficulty,

        score: (values.percent * 10_000.0).round() as i64,
        dx_score: 0,
        combo_status,
        sync_status: SyncStatus::NoSync,
        is_clear: values.lamp != "FAILED",
        is_new_record: false,
        is_dx_new_record: false,
        track: 0,
        matching_users: vec![],

        max_combo: values.optional.max_combo,
        total_combo: 0,
        max_sync: 0,
        total_sync: 0,

        fast_count: values.optional.fast,
        late_count: values.optional.slow,
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

        total_critical_perfect: values.judgements.pcrit,
        total_perfect: values.judgements.perfect,
        total_great: values.judgements.great,
        total_good: values.judgements.good,
        total_miss: values.judgements.miss,
    })
}

// kamai.tachi.ac 导入器，按活动流分页收集成绩 ID 再逐条拉取
#[derive(Clone)]
pub struct KamaiService {
    client: Client,
    user: String,
    api_interval: Duration,
}

impl KamaiService {
    pub fn new(user: String, api_interval: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(12))
            .build()
            .map_err(|e| AppError::Other(format!("构建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            user,
            api_interval,
        })
    }

    /// 遍历活动流收集全部成绩 ID，再逐条拉取并入库。
    /// 写入走 `PlayStore` 的幂等插入，重复遍历不会产生重复记录。
    pub async fn update(&self, plays: &PlayStore, songs: &SongStore) -> AppResult<()> {
        let mut all_score_ids: Vec<String> = Vec::new();
        let mut start_time: Option<i64> = None;

        // 每页以最后一个 session 的开始时间续传
        loop {
            let sessions = self.get_activity(start_time).await?;
            let Some(last) = sessions.last() else {
                break;
            };
            start_time = Some(last.time_started);

            let mut page_ids = 0usize;
            for session in &sessions {
                page_ids += session.score_ids.len();
                all_score_ids.extend(session.score_ids.iter().cloned());
            }
            log::info!("本页获取到 {page_ids} 个成绩 ID");

            tokio::time::sleep(self.api_interval).await;
        }

        for score_id in &all_score_ids {
            let body = self.get_score(score_id).await?;

            let (difficulty, song_type) = kamai_difficulty(&body.chart.difficulty)?;
            let (song_id, _chart) =
                resolve_chart(songs, &body.song.title, difficulty, song_type).await?;

            let play = score_to_entry(&body, song_id, difficulty)?;

            match plays.get_play(play.user_play_date).await {
                Err(AppError::PlayNotFound(_)) => {
                    plays.add_play(&play).await?;
                    log::info!("游玩记录 {} 已入库", play.user_play_date);
                }
                Ok(_) => {
                    log::debug!("游玩记录 {} 已存在，跳过", play.user_play_date);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.api_interval).await;
        }

        Ok(())
    }

    async fn get_activity(&self, start_time: Option<i64>) -> AppResult<Vec<SessionData>> {
        let mut url = format!(
            "{API_URL}/users/{}/games/maimaidx/Single/activity",
            self.user
        );
        if let Some(t) = start_time {
            url.push_str(&format!("?startTime={t}"));
        }

        let resp: ActivityResponse = self.client.get(url).send().await?.json().await?;
        if !resp.success {
            return Err(AppError::UpstreamError(
                "kamai 活动流接口返回失败".to_string(),
            ));
        }

        Ok(resp.body.recent_sessions)
    }

    async fn get_score(&self, score_id: &str) -> AppResult<ScoreBody> {
        let url = format!("{API_URL}/scores/{score_id}?getRelated");

        let resp: ScoreResponse = self.client.get(url).send().await?.json().await?;
        if !resp.success {
            return Err(AppError::UpstreamError(format!(
                "kamai 成绩接口返回失败: {score_id}"
            )));
        }

        Ok(resp.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::song::SongInfo;
    use sqlx::sqlite::SqlitePoolOptions;

    const SCORE_JSON: &str = r#"
    {
        "success": true,
        "body": {
            "score": {
                "timeAchieved": 1743108003000,
                "scoreData": {
                    "percent": 97.1017,
                    "lamp": "FULL COMBO",
                    "judgements": {
                        "pcrit": 393,
                        "perfect": 290,
                        "great": 82,
                        "good": 13,
                        "miss": 5
                    },
                    "optional": {
                        "fast": 53,
                        "slow": 66,
                        "maxCombo": 385
                    },
                    "enumIndexes": {"lamp": 2, "grade": 5}
                }
            },
            "song": {"title": "終焉逃避行"},
            "chart": {"difficulty": "DX Master", "levelNum": 13.3}
        }
    }
    "#;

    #[test]
    fn test_kamai_difficulty() {
        assert_eq!(
            kamai_difficulty("Master").expect("parse failed"),
            (Difficulty::Master, "std")
        );
        assert_eq!(
            kamai_difficulty("DX Re:Master").expect("parse failed"),
            (Difficulty::ReMaster, "dx")
        );
        assert!(matches!(
            kamai_difficulty("Ultima"),
            Err(AppError::UpstreamError(_))
        ));
    }

    #[test]
    fn test_score_to_entry() {
        let resp: ScoreResponse = serde_json::from_str(SCORE_JSON).expect("deserialize failed");
        let (difficulty, song_type) =
            kamai_difficulty(&resp.body.chart.difficulty).expect("parse failed");
        assert_eq!(song_type, "dx");

        let play = score_to_entry(&resp.body, 11441, difficulty).expect("conversion failed");

        assert_eq!(play.user_play_date, 1743108003);
        assert_eq!(play.song_id, 11441);
        assert_eq!(play.score, 971017);
        assert_eq!(play.combo_status, ComboStatus::FullCombo);
        assert!(play.is_clear);
        assert_eq!(play.fast_count, 53);
        assert_eq!(play.late_count, 66);
        // 细分全 0、仅带总数，入库校验按"无细分"放行
        assert_eq!(play.total_critical_perfect, 393);
        assert_eq!(play.tap_critical_perfect, 0);
        crate::utils::validation::validate_play(&play).expect("validation failed");
    }

    #[tokio::test]
    async fn test_resolve_chart_picks_matching_variant() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        let songs = SongStore::new(pool);
        songs.init_tables().await.expect("init failed");

        let make_song = |song_id: i64, song_type: &str, internal_level: i64| SongInfo {
            song_id,
            name: "天ノ弱".to_string(),
            artist: "164".to_string(),
            song_type: song_type.to_string(),
            bpm: 200,
            category: "niconico＆ボーカロイド".to_string(),
            version: "maimai GreeN".to_string(),
            sort: "100000".to_string(),
            charts: vec![ChartInfo {
                difficulty: Difficulty::Master,
                level: internal_level / 10,
                internal_level,
                notes_designer: "-".to_string(),
                max_notes: 600,
            }],
        };

        songs
            .add_song(&make_song(188, "std", 119))
            .await
            .expect("add failed");
        songs
            .add_song(&make_song(10188, "dx", 126))
            .await
            .expect("add failed");

        let (song_id, chart) = resolve_chart(&songs, "天ノ弱", Difficulty::Master, "dx")
            .await
            .expect("resolve failed");
        assert_eq!(song_id, 10188);
        assert_eq!(chart.internal_level, 126);

        // 难度在曲库中缺失时是硬性不一致
        match resolve_chart(&songs, "天ノ弱", Difficulty::ReMaster, "dx").await {
            Err(AppError::ChartNotFound(_)) => {}
            other => panic!("期望 ChartNotFound, 实际 {other:?}"),
        }
    }
}
