use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use mai_playlog_rust::config::{RunMode, CONFIG};
use mai_playlog_rust::routes;
use mai_playlog_rust::services::{PlayStore, RatingCache, SongStore, Updater};

async fn open_pool(database_url: &str) -> std::io::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(std::io::Error::other)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 加载.env文件
    dotenv().ok();

    // 初始化日志
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = CONFIG.clone();

    // --- 数据库初始化：曲库与游玩记录各一个文件 ---
    log::info!(
        "Connecting to databases: {} / {}",
        config.song_database_url,
        config.play_database_url
    );

    let play_pool = open_pool(&config.play_database_url).await?;
    let song_pool = open_pool(&config.song_database_url).await?;

    let play_store = PlayStore::new(play_pool.clone());
    play_store
        .init_tables()
        .await
        .map_err(std::io::Error::other)?;

    let song_store = SongStore::new(song_pool);
    song_store
        .init_tables()
        .await
        .map_err(std::io::Error::other)?;

    // Rating 缓存与游玩记录同库
    let rating_cache = RatingCache::new(play_pool);

    log::info!("Databases initialized successfully");

    // 仅更新模式：跑一轮后直接退出
    if config.run_mode == RunMode::UpdateOnly {
        let updater = Updater::from_config(&config).map_err(std::io::Error::other)?;
        return updater
            .run_once(&play_store, &song_store)
            .await
            .map_err(std::io::Error::other);
    }

    // 默认模式：后台周期更新 + HTTP 服务
    if config.run_mode == RunMode::Both {
        let updater = Updater::from_config(&config).map_err(std::io::Error::other)?;
        let plays = play_store.clone();
        let songs = song_store.clone();
        let interval = Duration::from_secs(config.update_interval_secs);

        tokio::spawn(async move {
            loop {
                if let Err(e) = updater.run_once(&plays, &songs).await {
                    log::error!("更新游玩记录失败: {e}");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let play_data = web::Data::new(play_store);
    let song_data = web::Data::new(song_store);
    let rating_data = web::Data::new(rating_cache);

    // 创建并启动HTTP服务器
    HttpServer::new(move || {
        // 配置CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(play_data.clone())
            .app_data(song_data.clone())
            .app_data(rating_data.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(routes::configure)
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
