use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::models::song::SongInfo;
use crate::models::{ApiResponse, CountResponse, PlayWithSong, RatingResponse};
use crate::services::play_store::PlayStore;
use crate::services::rating_cache::RatingCache;
use crate::services::song_store::SongStore;
use crate::utils::error::{AppResult, ErrorKind};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct PlaysQuery {
    // "asc" 或 "desc"，默认最新在前
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// 游玩记录对应的歌曲信息查不到时降级为 null，
// 曲库缺数据不应让整页翻不开；其他错误照常上抛
async fn lookup_song(song_store: &SongStore, song_id: i64) -> AppResult<Option<SongInfo>> {
    match song_store.get_song(song_id).await {
        Ok(song) => Ok(Some(song)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::Consistency) => {
            log::warn!("曲库缺少歌曲 {song_id}: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// 按游玩时间分页浏览，每条记录附带曲库中的歌曲信息
#[get("/plays")]
pub async fn get_plays(
    query: web::Query<PlaysQuery>,
    play_store: web::Data<PlayStore>,
    song_store: web::Data<SongStore>,
) -> AppResult<HttpResponse> {
    let ascending = matches!(query.order.as_deref(), Some("asc"));
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    log::info!("收到游玩记录分页查询: ascending={ascending}, limit={limit}, offset={offset}");

    let plays = play_store.get_plays(ascending, limit, offset).await?;

    let mut page = Vec::with_capacity(plays.len());
    for play in plays {
        let song = lookup_song(&song_store, play.song_id).await?;
        page.push(PlayWithSong { play, song });
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// 游玩记录总数。
#[utoipa::path(
    get,
    path = "/plays/count",
    responses(
        (status = 200, description = "游玩记录总数", body = CountResponse)
    )
)]
#[get("/plays/count")]
pub async fn get_play_count(play_store: web::Data<PlayStore>) -> AppResult<HttpResponse> {
    let count = play_store.get_count().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(CountResponse { count })))
}

// 按游玩时间点查单条记录
#[get("/play/{date}")]
pub async fn get_play(
    path: web::Path<i64>,
    play_store: web::Data<PlayStore>,
    song_store: web::Data<SongStore>,
) -> AppResult<HttpResponse> {
    let date = path.into_inner();

    let play = play_store.get_play(date).await?;
    let song = lookup_song(&song_store, play.song_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PlayWithSong { play, song })))
}

// 单条记录的第三代 DX Rating，按需补齐缓存
#[get("/play/{date}/rating")]
pub async fn get_play_rating(
    path: web::Path<i64>,
    rating_cache: web::Data<RatingCache>,
    song_store: web::Data<SongStore>,
) -> AppResult<HttpResponse> {
    let date = path.into_inner();

    let rating = rating_cache.get_rating(date, &song_store).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(RatingResponse {
        user_play_date: date,
        rating,
    })))
}
