use std::time::Duration;

use crate::config::{AppConfig, DataSource};
use crate::services::kamai::KamaiService;
use crate::services::play_store::PlayStore;
use crate::services::solips::SolipsService;
use crate::services::song_store::SongStore;
use crate::utils::error::{AppError, AppResult};

// 按配置选定的数据源分派更新
pub enum Updater {
    Solips(SolipsService),
    Kamai(KamaiService),
}

impl Updater {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_interval = Duration::from_secs(config.api_interval_secs);

        match config.data_source {
            DataSource::Solips => {
                let access_code = config.solips_access_code.clone().ok_or_else(|| {
                    AppError::ConfigError("缺少 SOLIPS_ACCESS_CODE 环境变量".to_string())
                })?;
                Ok(Updater::Solips(SolipsService::new(
                    access_code,
                    api_interval,
                )?))
            }
            DataSource::Kamai => {
                let user = config
                    .kamai_user
                    .clone()
                    .ok_or_else(|| AppError::ConfigError("缺少 KAMAI_USER 环境变量".to_string()))?;
                Ok(Updater::Kamai(KamaiService::new(user, api_interval)?))
            }
        }
    }

    // 执行一轮完整更新
    pub async fn run_once(&self, plays: &PlayStore, songs: &SongStore) -> AppResult<()> {
        log::info!("开始更新游玩记录");

        match self {
            Updater::Solips(service) => service.update(plays, songs).await,
            Updater::Kamai(service) => service.update(plays, songs).await,
        }
    }
}
