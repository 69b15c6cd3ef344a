// 把 solips 导出的 JSON 游玩记录批量导入 sqlite3 数据库的脚本。
// 写入是幂等的，重复运行不会产生重复记录。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use mai_playlog_rust::services::play_store::PlayStore;
use mai_playlog_rust::services::solips::{playlog_detail_to_entry, MaimaiPlaylogDetail};

#[derive(Parser)]
#[command(about = "把 JSON 游玩记录导入游玩数据库")]
struct Args {
    /// 游玩数据库文件
    #[arg(short, long, default_value = "plays.db")]
    playdb: PathBuf,

    /// 导出的 JSON 文件
    file: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylogDump {
    // 兼容大小写两种导出格式的键名
    #[serde(alias = "PlaylogDetail")]
    playlog_detail: Vec<MaimaiPlaylogDetail>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let options = SqliteConnectOptions::new()
        .filename(&args.playdb)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("打开游玩数据库失败")?;

    let store = PlayStore::new(pool);
    store.init_tables().await?;

    let data = std::fs::read_to_string(&args.file)
        .with_context(|| format!("读取 {} 失败", args.file.display()))?;
    let dump: PlaylogDump = serde_json::from_str(&data).context("解析 JSON 失败")?;

    for detail in &dump.playlog_detail {
        let play = playlog_detail_to_entry(detail)?;
        store.add_play(&play).await?;
    }

    log::info!("导入完成，共处理 {} 条记录", dump.playlog_detail.len());
    Ok(())
}
