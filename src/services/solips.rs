use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::models::play::{ComboStatus, PlaylogEntry, SyncStatus};
use crate::models::song::Difficulty;
use crate::services::play_store::PlayStore;
use crate::services::song_store::SongStore;
use crate::utils::error::{AppError, AppResult};

// solips.app API 相关的常量
const LOGIN_URL: &str = "https://www.solips.app/api/trpc/card.link?batch=1";
const PLAYLOG_URL: &str = r#"https://www.solips.app/api/trpc/maimai.playlog,maimai.favorites?batch=1&input={"0":{"json":null,"meta":{"values":["undefined"]}},"1":{"json":null,"meta":{"values":["undefined"]}}}"#;
const DETAIL_URL_PREFIX: &str =
    r#"https://www.solips.app/api/trpc/maimai.playlogDetail,maimai.favorites?batch=1&input="#;

// 接口固定返回最近 100 条
const PLAYLOG_LENGTH: usize = 100;

// tRPC 批量响应的外层包装：一个单元素数组，内容藏在 result.data.json
#[derive(Debug, Deserialize)]
struct TrpcEnvelope<T> {
    result: TrpcResult<T>,
}

#[derive(Debug, Deserialize)]
struct TrpcResult<T> {
    data: TrpcData<T>,
}

#[derive(Debug, Deserialize)]
struct TrpcData<T> {
    json: T,
}

// 概要列表里只关心 playlogApiId 和游玩时间
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylogSummary {
    pub playlog_api_id: String,
    pub info: PlaylogSummaryInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylogSummaryInfo {
    pub user_play_date: String,
}

/// 单条游玩的完整上游数据。`import_playlog` 脚本读取的导出文件
/// 也是这个形状，两边共用同一套结构。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaimaiPlaylogDetail {
    pub info: PlaylogDetailInfo,
    pub detail: PlaylogDetailCounts,
    #[serde(default)]
    pub matching_users: Vec<MatchingUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylogDetailInfo {
    pub music_id: i64,
    pub level: String,
    pub achievement: i64,
    pub deluxscore: i64,
    pub score_rank: String,
    pub combo_status: String,
    pub sync_status: String,
    pub is_clear: bool,
    pub is_achieve_new_record: bool,
    pub is_deluxscore_new_record: bool,
    pub track: i64,
    pub user_play_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylogDetailCounts {
    pub judge_tap: JudgeTap,
    pub judge_hold: JudgeHold,
    pub judge_slide: JudgeSlide,
    pub judge_touch: JudgeTouch,
    pub judge_break: JudgeBreak,

    pub max_combo: i64,
    pub total_combo: i64,
    pub max_sync: i64,
    pub total_sync: i64,
    pub fast_count: i64,
    pub late_count: i64,
    pub before_rating: i64,
    pub after_rating: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeTap {
    pub tap_critical_perfect: i64,
    pub tap_perfect: i64,
    pub tap_great: i64,
    pub tap_good: i64,
    pub tap_miss: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeHold {
    pub hold_critical_perfect: i64,
    pub hold_perfect: i64,
    pub hold_great: i64,
    pub hold_good: i64,
    pub hold_miss: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeSlide {
    pub slide_critical_perfect: i64,
    pub slide_perfect: i64,
    pub slide_great: i64,
    pub slide_good: i64,
    pub slide_miss: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeTouch {
    pub touch_critical_perfect: i64,
    pub touch_perfect: i64,
    pub touch_great: i64,
    pub touch_good: i64,
    pub touch_miss: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeBreak {
    pub break_critical_perfect: i64,
    pub break_perfect: i64,
    pub break_great: i64,
    pub break_good: i64,
    pub break_miss: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingUser {
    pub user_name: String,
}

fn level_to_difficulty(level: &str) -> AppResult<Difficulty> {
    match level {
        "MAIMAI_LEVEL_BASIC" => Ok(Difficulty::Basic),
        "MAIMAI_LEVEL_ADVANCED" => Ok(Difficulty::Advanced),
        "MAIMAI_LEVEL_EXPERT" => Ok(Difficulty::Expert),
        "MAIMAI_LEVEL_MASTER" => Ok(Difficulty::Master),
        "MAIMAI_LEVEL_REMASTER" => Ok(Difficulty::ReMaster),
        "MAIMAI_LEVEL_UTAGE" => Ok(Difficulty::Utage),
        other => Err(AppError::UpstreamError(format!("无效的难度标签: {other}"))),
    }
}

fn parse_combo_status(status: &str) -> AppResult<ComboStatus> {
    match status {
        "MAIMAI_COMBO_STATUS_NONE" => Ok(ComboStatus::NoCombo),
        "MAIMAI_COMBO_STATUS_FULL_COMBO" => Ok(ComboStatus::FullCombo),
        "MAIMAI_COMBO_STATUS_FULL_COMBO_PLUS" => Ok(ComboStatus::FullComboPlus),
        "MAIMAI_COMBO_STATUS_ALL_PERFECT" => Ok(ComboStatus::AllPerfect),
        "MAIMAI_COMBO_STATUS_ALL_PERFECT_PLUS" => Ok(ComboStatus::AllPerfectPlus),
        other => Err(AppError::UpstreamError(format!(
            "无效的连击状态标签: {other}"
        ))),
    }
}

fn parse_sync_status(status: &str) -> AppResult<SyncStatus> {
    match status {
        "MAIMAI_SYNC_STATUS_NONE" => Ok(SyncStatus::NoSync),
        "MAIMAI_SYNC_STATUS_FULL_SYNC" => Ok(SyncStatus::FullSync),
        "MAIMAI_SYNC_STATUS_FULL_SYNC_PLUS" => Ok(SyncStatus::FullSyncPlus),
        "MAIMAI_SYNC_STATUS_FULL_SYNC_DX" => Ok(SyncStatus::FullSyncDx),
        "MAIMAI_SYNC_STATUS_FULL_SYNC_DX_PLUS" => Ok(SyncStatus::FullSyncDxPlus),
        other => Err(AppError::UpstreamError(format!(
            "无效的同步状态标签: {other}"
        ))),
    }
}

fn parse_play_date(date: &str) -> AppResult<i64> {
    let parsed = chrono::DateTime::parse_from_rfc3339(date)
        .map_err(|e| AppError::UpstreamError(format!("无法解析游玩时间 '{date}': {e}")))?;
    Ok(parsed.timestamp())
}

/// 把上游的完整游玩数据映射为入库模型。
/// 五档总数由各音符类型细分相加得出（上游不单独下发总数）。
pub fn playlog_detail_to_entry(detail: &MaimaiPlaylogDetail) -> AppResult<PlaylogEntry> {
    let user_play_date = parse_play_date(&detail.info.user_play_date)?;
    let difficulty = level_to_difficulty(&detail.info.level)?;
    let combo_status = parse_combo_status(&detail.info.combo_status)?;
    let sync_status = parse_sync_status(&detail.info.sync_status)?;

    let matching_users = detail
        .matching_users
        .iter()
        .map(|u| u.user_name.clone())
        .collect();

    let d = &detail.detail;

    Ok(PlaylogEntry {
        user_play_date,
        song_id: detail.info.music_id,
        difficulty,

        score: detail.info.achievement,
        dx_score: detail.info.deluxscore,
        combo_status,
        sync_status,
        is_clear: detail.info.is_clear,
        is_new_record: detail.info.is_achieve_new_record,
        is_dx_new_record: detail.info.is_deluxscore_new_record,
        track: detail.info.track,
        matching_users,

        max_combo: d.max_combo,
        total_combo: d.total_combo,
        max_sync: d.max_sync,
        total_sync: d.total_sync,

        fast_count: d.fast_count,
        late_count: d.late_count,
        before_rating: d.before_rating,
        after_rating: d.after_rating,

        tap_critical_perfect: d.judge_tap.tap_critical_perfect,
        tap_perfect: d.judge_tap.tap_perfect,
        tap_great: d.judge_tap.tap_great,
        tap_good: d.judge_tap.tap_good,
        tap_miss: d.judge_tap.tap_miss,

        hold_critical_perfect: d.judge_hold.hold_critical_perfect,
        hold_perfect: d.judge_hold.hold_perfect,
        hold_great: d.judge_hold.hold_great,
        hold_good: d.judge_hold.hold_good,
        hold_miss: d.judge_hold.hold_miss,

        slide_critical_perfect: d.judge_slide.slide_critical_perfect,
        slide_perfect: d.judge_slide.slide_perfect,
        slide_great: d.judge_slide.slide_great,
        slide_good: d.judge_slide.slide_good,
        slide_miss: d.judge_slide.slide_miss,

        touch_critical_perfect: d.judge_touch.touch_critical_perfect,
        touch_perfect: d.judge_touch.touch_perfect,
        touch_great: d.judge_touch.touch_great,
        touch_good: d.judge_touch.touch_good,
        touch_miss: d.judge_touch.touch_miss,

        break_critical_perfect: d.judge_break.break_critical_perfect,
        break_perfect: d.judge_break.break_perfect,
        break_great: d.judge_break.break_great,
        break_good: d.judge_break.break_good,
        break_miss: d.judge_break.break_miss,

        total_critical_perfect: d.judge_tap.tap_critical_perfect
            + d.judge_hold.hold_critical_perfect
            + d.judge_slide.slide_critical_perfect
            + d.judge_touch.touch_critical_perfect
            + d.judge_break.break_critical_perfect,

        total_perfect: d.judge_tap.tap_perfect
            + d.judge_hold.hold_perfect
            + d.judge_slide.slide_perfect
            + d.judge_touch.touch_perfect
            + d.judge_break.break_perfect,

        total_great: d.judge_tap.tap_great
            + d.judge_hold.hold_great
            + d.judge_slide.slide_great
            + d.judge_touch.touch_great
            + d.judge_break.break_great,

        total_good: d.judge_tap.tap_good
            + d.judge_hold.hold_good
            + d.judge_slide.slide_good
            + d.judge_touch.touch_good
            + d.judge_break.break_good,

        total_miss: d.judge_tap.tap_miss
            + d.judge_hold.hold_miss
            + d.judge_slide.slide_miss
            + d.judge_touch.touch_miss
            + d.judge_break.break_miss,
    })
}

// solips.app 导入器。
// 会话 cookie 归这个实例的 HTTP 客户端所有，不使用进程级的全局 jar。
#[derive(Clone)]
pub struct SolipsService {
    client: Client,
    access_code: String,
    api_interval: Duration,
}

impl SolipsService {
    pub fn new(access_code: String, api_interval: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(12))
            .build()
            .map_err(|e| AppError::Other(format!("构建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            access_code,
            api_interval,
        })
    }

    /// 拉取最近 100 条游玩概要，对库里没有的记录逐条取详情入库。
    /// 依赖 `PlayStore` 的幂等写入：同一条记录反复出现在概要页里
    /// 也只会落库一次。
    pub async fn update(&self, plays: &PlayStore, songs: &SongStore) -> AppResult<()> {
        let playlog = self.get_playlog().await?;
        validate_playlog(&playlog)?;

        for entry in &playlog {
            let play_date = parse_play_date(&entry.info.user_play_date)?;

            match plays.get_play(play_date).await {
                Err(AppError::PlayNotFound(_)) => {
                    let detail = self.get_playlog_detail(&entry.playlog_api_id).await?;
                    validate_playlog_detail(&detail, songs).await?;

                    let play = playlog_detail_to_entry(&detail)?;
                    plays.add_play(&play).await?;

                    log::info!("游玩记录 {play_date} 已入库");
                    tokio::time::sleep(self.api_interval).await;
                }
                Ok(_) => {
                    log::debug!("游玩记录 {play_date} 已存在，跳过");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    // 用机台访问码换取会话 cookie
    async fn login(&self) -> AppResult<()> {
        let body = format!(r#"{{"0":{{"json":"{}"}}}}"#, self.access_code);

        self.client
            .post(LOGIN_URL)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::UpstreamError(format!("登录 solips.app 失败: {e}")))?;

        Ok(())
    }

    // 获取最近 100 条游玩的概要列表
    async fn get_playlog(&self) -> AppResult<Vec<PlaylogSummary>> {
        self.login().await?;

        let envelopes: Vec<TrpcEnvelope<Vec<PlaylogSummary>>> =
            self.client.get(PLAYLOG_URL).send().await?.json().await?;

        envelopes
            .into_iter()
            .next()
            .map(|e| e.result.data.json)
            .ok_or_else(|| AppError::UpstreamError("tRPC 批量响应为空".to_string()))
    }

    // 获取单条游玩的完整数据，依赖 login 留下的会话 cookie
    async fn get_playlog_detail(&self, playlog_api_id: &str) -> AppResult<MaimaiPlaylogDetail> {
        let input = format!(
            r#"{{"0":{{"json":{{"playlogId":"{playlog_api_id}"}}}},"1":{{"json":null,"meta":{{"values":["undefined"]}}}}}}"#
        );
        let url = format!("{DETAIL_URL_PREFIX}{input}");

        let envelopes: Vec<TrpcEnvelope<MaimaiPlaylogDetail>> =
            self.client.get(url).send().await?.json().await?;

        envelopes
            .into_iter()
            .next()
            .map(|e| e.result.data.json)
            .ok_or_else(|| AppError::UpstreamError("tRPC 批量响应为空".to_string()))
    }
}

// 概要页的完整性检查：条数固定、无重复
fn validate_playlog(playlog: &[PlaylogSummary]) -> AppResult<()> {
    if playlog.len() != PLAYLOG_LENGTH {
        return Err(AppError::UpstreamError(format!(
            "游玩概要条数异常: 期望 {PLAYLOG_LENGTH}, 实际 {}",
            playlog.len()
        )));
    }

    let mut seen_ids = HashSet::new();
    let mut seen_dates = HashSet::new();
    for entry in playlog {
        if !seen_ids.insert(entry.playlog_api_id.as_str()) {
            return Err(AppError::UpstreamError(format!(
                "重复的 playlogApiId: {}",
                entry.playlog_api_id
            )));
        }
        if !seen_dates.insert(entry.info.user_play_date.as_str()) {
            return Err(AppError::UpstreamError(format!(
                "重复的游玩时间: {}",
                entry.info.user_play_date
            )));
        }
    }

    Ok(())
}

// 与曲库交叉核对：谱面的物量应与本局的 total_combo 一致。
// 上游某些老记录不带 total_combo（为 0），曲库缺物量时也放行。
async fn validate_playlog_detail(
    detail: &MaimaiPlaylogDetail,
    songs: &SongStore,
) -> AppResult<()> {
    if detail.info.user_play_date.is_empty() {
        return Err(AppError::UpstreamError(
            "游玩详情缺少 userPlayDate".to_string(),
        ));
    }

    let song = songs.get_song(detail.info.music_id).await?;
    let difficulty = level_to_difficulty(&detail.info.level)?;

    let total_combo = detail.detail.total_combo;
    if total_combo == 0 {
        return Ok(());
    }

    for chart in &song.charts {
        if chart.difficulty == difficulty && (chart.max_notes == total_combo || chart.max_notes == 0)
        {
            return Ok(());
        }
    }

    Err(AppError::UpstreamError(format!(
        "游玩详情与曲库不符: 歌曲 {} 难度 {:?} 的物量对不上 total_combo={total_combo}",
        detail.info.music_id, difficulty
    )))
}
