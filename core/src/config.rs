//! Connection settings for an amoCRM account.

use crate::error::ApiError;

pub const ENV_BASE_URL: &str = "AMOCRM_BASE_URL";
pub const ENV_LOGIN: &str = "AMOCRM_LOGIN";
pub const ENV_API_KEY: &str = "AMOCRM_API_KEY";

/// Account URL plus the login/API-key pair sent as `USER_LOGIN`/`USER_HASH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub login: String,
    pub api_key: String,
}

impl Config {
    pub fn new(base_url: &str, login: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            login: login.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Config for a `<subdomain>.amocrm.ru` account.
    pub fn for_subdomain(subdomain: &str, login: &str, api_key: &str) -> Self {
        Self::new(&format!("https://{subdomain}.amocrm.ru"), login, api_key)
    }

    /// Read `AMOCRM_BASE_URL`, `AMOCRM_LOGIN` and `AMOCRM_API_KEY`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ApiError::Config(format!("{key} is not set")))
        };
        let base_url = get(ENV_BASE_URL)?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::Config(format!(
                "{ENV_BASE_URL} must be an http(s) URL, got {base_url:?}"
            )));
        }
        Ok(Self::new(&base_url, &get(ENV_LOGIN)?, &get(ENV_API_KEY)?))
    }
}
