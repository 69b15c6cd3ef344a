use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::models::ApiResponse;
use crate::services::song_store::SongStore;
use crate::utils::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct SongSearchQuery {
    pub name: Option<String>,
    pub version: Option<String>,
}

// 按曲库 ID 查询歌曲及其全部谱面
#[get("/song/{id}")]
pub async fn get_song(
    path: web::Path<i64>,
    song_store: web::Data<SongStore>,
) -> AppResult<HttpResponse> {
    let song_id = path.into_inner();
    log::info!("收到歌曲查询: song_id={song_id}");

    let song = song_store.get_song(song_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(song)))
}

// 按名称（精确）或版本标签（忽略大小写）检索歌曲
#[get("/song/search")]
pub async fn search_songs(
    query: web::Query<SongSearchQuery>,
    song_store: web::Data<SongStore>,
) -> AppResult<HttpResponse> {
    log::info!(
        "收到歌曲检索: name={:?}, version={:?}",
        query.name,
        query.version
    );

    let songs = if let Some(name) = &query.name {
        song_store.get_songs_by_name(name).await?
    } else if let Some(version) = &query.version {
        song_store.get_songs_by_version(version).await?
    } else {
        return Ok(HttpResponse::BadRequest().json(ApiResponse {
            code: 400,
            status: "error".to_string(),
            message: Some("请提供查询参数 name 或 version".to_string()),
            data: None::<()>,
        }));
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok(songs)))
}
