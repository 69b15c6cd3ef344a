use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

// 进程运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    // 仅运行一次数据更新后退出
    UpdateOnly,
    // 仅运行 HTTP 后端
    BackendOnly,
    // 后端 + 周期更新（默认）
    Both,
}

// 游玩记录的外部数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Solips,
    Kamai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub song_database_url: String,
    pub play_database_url: String,
    pub run_mode: RunMode,
    pub data_source: DataSource,
    pub solips_access_code: Option<String>,
    pub kamai_user: Option<String>,
    // 两次更新之间的等待秒数
    pub update_interval_secs: u64,
    // 对外部 API 两次请求之间的等待秒数
    pub api_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            song_database_url: env::var("SONG_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:songs.db".to_string()),
            play_database_url: env::var("PLAY_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:plays.db".to_string()),
            run_mode: match env::var("RUN_MODE").as_deref() {
                Ok("update") => RunMode::UpdateOnly,
                Ok("backend") => RunMode::BackendOnly,
                _ => RunMode::Both,
            },
            data_source: match env::var("DATA_SOURCE").as_deref() {
                Ok("kamai") => DataSource::Kamai,
                _ => DataSource::Solips,
            },
            solips_access_code: env::var("SOLIPS_ACCESS_CODE").ok(),
            kamai_user: env::var("KAMAI_USER").ok(),
            update_interval_secs: env::var("UPDATE_INTERVAL")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .unwrap_or(900),
            api_interval_secs: env::var("API_INTERVAL")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        }
    }
}

lazy_static! {
    pub static ref CONFIG: Arc<AppConfig> = Arc::new(AppConfig::default());
}
