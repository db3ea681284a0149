//! App Configuration
//!
//! 환경 변수(.env.local / .env 포함)에서 앱 설정을 읽습니다.
//! 빈 값은 기본값으로 대체하고, 해석할 수 없는 값은 오류로 처리합니다.

use std::time::Duration;
use url::Url;

use crate::biometric::DEFAULT_AUTH_REASON;
use crate::provider::{DEFAULT_RECIPES_URL, DEFAULT_TIMEOUT};
use crate::secure_store::DEFAULT_SESSION_MAX_AGE;

pub const ENV_RECIPES_URL: &str = "RECIPE_APP_RECIPES_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "RECIPE_APP_HTTP_TIMEOUT_SECS";
pub const ENV_KEYCHAIN_SERVICE: &str = "RECIPE_APP_KEYCHAIN_SERVICE";
pub const ENV_AUTH_REASON: &str = "RECIPE_APP_AUTH_REASON";
pub const ENV_SESSION_MAX_AGE_SECS: &str = "RECIPE_APP_SESSION_MAX_AGE_SECS";

/// Keychain 서비스 이름 기본값
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "com.recipeapp.app";

/// 설정 오류
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL in {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid number in {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

/// 앱 설정
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub recipes_url: Url,
    pub http_timeout: Duration,
    pub keychain_service: String,
    pub auth_reason: String,
    pub session_max_age: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recipes_url: Url::parse(DEFAULT_RECIPES_URL).expect("default recipes URL is valid"),
            http_timeout: DEFAULT_TIMEOUT,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            auth_reason: DEFAULT_AUTH_REASON.to_string(),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
        }
    }
}

impl AppConfig {
    /// `.env.local`, `.env` 를 로드한 뒤 프로세스 환경에서 설정 생성
    ///
    /// 파일이 없어도 실패하지 않습니다. 이미 설정된 환경 변수는 덮어쓰지 않습니다.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 생성
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let recipes_url = match get(ENV_RECIPES_URL) {
            Some(raw) => Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
                key: ENV_RECIPES_URL,
                source,
            })?,
            None => defaults.recipes_url,
        };

        let http_timeout = parse_secs(get(ENV_HTTP_TIMEOUT_SECS), ENV_HTTP_TIMEOUT_SECS)?
            .unwrap_or(defaults.http_timeout);
        let session_max_age = parse_secs(get(ENV_SESSION_MAX_AGE_SECS), ENV_SESSION_MAX_AGE_SECS)?
            .unwrap_or(defaults.session_max_age);

        Ok(Self {
            recipes_url,
            http_timeout,
            keychain_service: get(ENV_KEYCHAIN_SERVICE).unwrap_or(defaults.keychain_service),
            auth_reason: get(ENV_AUTH_REASON).unwrap_or(defaults.auth_reason),
            session_max_age,
        })
    }
}

fn parse_secs(raw: Option<String>, key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
            _ => Err(ConfigError::InvalidNumber { key, value }),
        },
    }
}
