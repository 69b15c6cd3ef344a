// 把 songs.json 曲库数据批量导入 sqlite3 数据库的脚本。
// 已存在的歌曲与谱面保持不变，可随版本更新反复运行。

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use mai_playlog_rust::models::song::{ChartInfo, Difficulty, SongInfo};
use mai_playlog_rust::services::song_store::SongStore;

#[derive(Parser)]
#[command(about = "把 songs.json 导入曲库数据库")]
struct Args {
    /// 曲库数据库文件
    #[arg(short, long, default_value = "songs.db")]
    songdb: PathBuf,

    /// songs.json 文件
    file: PathBuf,
}

#[derive(Deserialize)]
struct SongDump {
    song_id: i64,
    name: String,
    artist: String,
    #[serde(rename = "type")]
    song_type: String,
    bpm: f64,
    category: String,
    version: String,
    sort: String,
    #[serde(default)]
    charts: Vec<ChartDump>,
}

#[derive(Deserialize)]
struct ChartDump {
    difficulty: String,
    level: i64,
    // 定数，JSON 里是小数（如 13.3），入库前转为 ×10 定点
    internal_level: f64,
    #[serde(default)]
    notes_designer: String,
    #[serde(default)]
    max_notes: i64,
}

fn parse_difficulty(difficulty: &str) -> anyhow::Result<Difficulty> {
    Ok(match difficulty.to_lowercase().as_str() {
        "basic" => Difficulty::Basic,
        "advanced" => Difficulty::Advanced,
        "expert" => Difficulty::Expert,
        "master" => Difficulty::Master,
        "remaster" => Difficulty::ReMaster,
        "utage" => Difficulty::Utage,
        other => bail!("无效的难度名: {other}"),
    })
}

impl SongDump {
    fn into_song_info(self) -> anyhow::Result<SongInfo> {
        let mut charts = Vec::with_capacity(self.charts.len());
        for chart in self.charts {
            charts.push(ChartInfo {
                difficulty: parse_difficulty(&chart.difficulty)?,
                level: chart.level,
                internal_level: (chart.internal_level * 10.0).round() as i64,
                notes_designer: chart.notes_designer,
                max_notes: chart.max_notes,
            });
        }

        Ok(SongInfo {
            song_id: self.song_id,
            name: self.name,
            artist: self.artist,
            song_type: self.song_type,
            bpm: self.bpm as i64,
            category: self.category,
            version: self.version,
            sort: self.sort,
            charts,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let options = SqliteConnectOptions::new()
        .filename(&args.songdb)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("打开曲库数据库失败")?;

    let store = SongStore::new(pool);
    store.init_tables().await?;

    let data = std::fs::read_to_string(&args.file)
        .with_context(|| format!("读取 {} 失败", args.file.display()))?;
    let songs: Vec<SongDump> = serde_json::from_str(&data).context("解析 JSON 失败")?;

    let total = songs.len();
    for song in songs {
        let info = song.into_song_info()?;
        store.add_song(&info).await?;
    }

    log::info!("导入完成，共处理 {total} 首歌曲");
    Ok(())
}
