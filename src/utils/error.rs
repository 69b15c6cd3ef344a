use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

// 错误大类，供调用方与 HTTP 层做穷尽分派。
// "不存在" / "数据不合法" / "库内数据不一致" / "存储失败" 必须可区分，
// 调用方按变体匹配，绝不解析错误文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Consistency,
    Storage,
    Upstream,
    Config,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("找不到歌曲: song_id={0}")]
    SongNotFound(i64),

    #[error("找不到游玩记录: user_play_date={0}")]
    PlayNotFound(i64),

    #[error("找不到谱面: {0}")]
    ChartNotFound(String),

    #[error("校验错误: {0}")]
    ValidationError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("上游数据错误: {0}")]
    UpstreamError(String),

    #[error("HTTP请求错误: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Serde JSON错误: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("其他错误: {0}")]
    Other(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::SongNotFound(_) | AppError::PlayNotFound(_) => ErrorKind::NotFound,
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::ChartNotFound(_) => ErrorKind::Consistency,
            AppError::DatabaseError(_) => ErrorKind::Storage,
            AppError::UpstreamError(_)
            | AppError::ReqwestError(_)
            | AppError::SerdeJsonError(_) => ErrorKind::Upstream,
            AppError::IoError(_) => ErrorKind::Storage,
            AppError::ConfigError(_) => ErrorKind::Config,
            AppError::Other(_) => ErrorKind::Internal,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_type = match self {
            AppError::SongNotFound(_) => "song_not_found",
            AppError::PlayNotFound(_) => "play_not_found",
            AppError::ChartNotFound(_) => "chart_not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::DatabaseError(_) => "database_error",
            AppError::UpstreamError(_) => "upstream_error",
            AppError::ReqwestError(_) => "request_error",
            AppError::SerdeJsonError(_) => "serialization_error",
            AppError::IoError(_) => "io_error",
            AppError::ConfigError(_) => "configuration_error",
            AppError::Other(_) => "other_error",
        };

        let status_code = match self.kind() {
            ErrorKind::NotFound => actix_web::http::StatusCode::NOT_FOUND,
            ErrorKind::Validation => actix_web::http::StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => actix_web::http::StatusCode::BAD_GATEWAY,
            ErrorKind::Consistency
            | ErrorKind::Storage
            | ErrorKind::Config
            | ErrorKind::Internal => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        HttpResponse::build(status_code).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        })
    }
}
