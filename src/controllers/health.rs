use actix_web::{get, HttpResponse, Responder};

/// 健康检查端点，供 systemd / 反向代理等外部监控探活使用。
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "服务正常", body = String, example = json!("OK"))
    )
)]
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
