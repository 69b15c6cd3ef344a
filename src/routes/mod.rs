use actix_web::web;

use crate::controllers::*;

// 配置所有路由。
// 服务实例在 main.rs 中创建并通过 web::Data 注入，这里只注册处理函数。
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // 探活与统计
        .service(health_check)
        .service(get_status)
        // 游玩记录相关路由
        .service(get_plays)
        .service(get_play_count)
        .service(get_play_rating)
        .service(get_play)
        // 曲库相关路由
        .service(search_songs)
        .service(get_song);
}
