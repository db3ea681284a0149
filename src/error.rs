//! RecipeApp Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::provider::FetchError;
use crate::roundtrip::{RetrievalError, StoreItemError};

/// RecipeApp 애플리케이션 에러
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    StoreItem(#[from] StoreItemError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),
}

/// 프론트엔드 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Fetch(FetchError::Timeout) => "FETCH_TIMEOUT",
            AppError::Fetch(FetchError::Status(_)) => "FETCH_HTTP_ERROR",
            AppError::Fetch(FetchError::Decode(_) | FetchError::InvalidCollection(_)) => {
                "FETCH_PARSE_ERROR"
            }
            AppError::Fetch(FetchError::Request(_)) => "FETCH_REQUEST_FAILED",
            AppError::Codec(_) => "CODEC_ERROR",
            AppError::StoreItem(_) => "SECURE_STORE_ERROR",
            AppError::Retrieval(_) => "RETRIEVAL_ERROR",
            AppError::RecipeNotFound(_) => "RECIPE_NOT_FOUND",
        };

        let details = match &error {
            AppError::Retrieval(e) => serde_json::to_string(&e.kind()).ok(),
            _ => None,
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
