use gateway_errors::AppError;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_APP_ENV: &str = "dev";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_READ_TIMEOUT_SECS: f64 = 60.0;
const DEFAULT_WRITE_TIMEOUT_SECS: f64 = 30.0;
const DEFAULT_TOTAL_TIMEOUT_SECS: f64 = 90.0;
const DEFAULT_RETRY_CONNECT_ERRORS: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

/// Process configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: String,
    pub log_level: String,
    pub llm_base_url: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub total_timeout: Duration,
    pub retry_connect_errors: u32,
    pub retry_backoff: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_env: DEFAULT_APP_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs_f64(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs_f64(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs_f64(DEFAULT_WRITE_TIMEOUT_SECS),
            total_timeout: Duration::from_secs_f64(DEFAULT_TOTAL_TIMEOUT_SECS),
            retry_connect_errors: DEFAULT_RETRY_CONNECT_ERRORS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            app_env: get("APP_ENV").unwrap_or(defaults.app_env),
            log_level: get("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
            llm_base_url: get("VLLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            connect_timeout: parse_secs(get("HTTP_CONNECT_TIMEOUT"), "HTTP_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.connect_timeout),
            read_timeout: parse_secs(get("HTTP_READ_TIMEOUT"), "HTTP_READ_TIMEOUT")?
                .unwrap_or(defaults.read_timeout),
            write_timeout: parse_secs(get("HTTP_WRITE_TIMEOUT"), "HTTP_WRITE_TIMEOUT")?
                .unwrap_or(defaults.write_timeout),
            total_timeout: parse_secs(get("HTTP_TOTAL_TIMEOUT"), "HTTP_TOTAL_TIMEOUT")?
                .unwrap_or(defaults.total_timeout),
            retry_connect_errors: parse_or(
                get("RETRY_CONNECT_ERRORS"),
                "RETRY_CONNECT_ERRORS",
                defaults.retry_connect_errors,
            )?,
            retry_backoff: Duration::from_millis(parse_or(
                get("RETRY_BACKOFF_MS"),
                "RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
            )?),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, AppError> {
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, v))),
        None => Ok(default),
    }
}

fn parse_secs(value: Option<String>, key: &str) -> Result<Option<Duration>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let secs: f64 = raw
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw)))?;
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| AppError::Config(format!("{} must be a non-negative number of seconds", key)))
}
