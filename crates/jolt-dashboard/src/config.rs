use crate::api::ApiError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER: &str = "http://localhost:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const EVENTS_PATH: &str = "api/v1/tasks/events";

#[derive(Clone, Debug)]
pub struct Config {
    pub server: Url,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_stdout: bool,
    pub reconnect_delay: Duration,
}

/// Flags shared by every subcommand. Anything left unset falls back to the
/// `JOLT_*` environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    pub reconnect_secs: u64,
}

pub fn load_config(overrides: &ConfigOverrides) -> Result<Config, ApiError> {
    let server = resolve_server(
        overrides.server.as_deref(),
        std::env::var("JOLT_SERVER").ok(),
    )?;
    let log_dir = overrides.log_dir.clone().or_else(resolve_log_dir);
    let log_level = if overrides.debug {
        "debug".to_string()
    } else {
        resolve_log_level()
    };
    let log_stdout = std::env::var("JOLT_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false);
    Ok(Config {
        server,
        log_dir,
        log_level,
        log_stdout,
        reconnect_delay: Duration::from_secs(overrides.reconnect_secs.max(1)),
    })
}

fn resolve_server(flag: Option<&str>, env: Option<String>) -> Result<Url, ApiError> {
    if let Some(value) = flag {
        if !value.trim().is_empty() {
            return normalize_server_url(value);
        }
    }
    if let Some(value) = env {
        if !value.trim().is_empty() {
            return normalize_server_url(&value);
        }
    }
    normalize_server_url(DEFAULT_SERVER)
}

fn resolve_log_dir() -> Option<PathBuf> {
    match std::env::var("JOLT_LOG_DIR") {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value.trim())),
        _ => None,
    }
}

fn resolve_log_level() -> String {
    match std::env::var("JOLT_LOG_LEVEL") {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => DEFAULT_LOG_LEVEL.to_string(),
    }
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses a server address into a base URL that API paths can be joined
/// onto. A bare `host:port` is taken as plain http.
pub fn normalize_server_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let mut url = Url::parse(&candidate)?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ApiError::Scheme(other.to_string())),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// The task event stream lives next to the REST API; `https` servers get
/// `wss`.
pub fn events_url(server: &Url) -> Result<Url, ApiError> {
    let mut url = server.join(EVENTS_PATH)?;
    let scheme = match server.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(ApiError::Scheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::Scheme(scheme.to_string()))?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_flag_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool_flag(value), Some(true), "{value}");
        }
        for value in ["0", "False", "no", "OFF"] {
            assert_eq!(parse_bool_flag(value), Some(false), "{value}");
        }
        assert_eq!(parse_bool_flag("maybe"), None);
    }

    #[test]
    fn flag_wins_over_environment_value() {
        let url = resolve_server(
            Some("http://flag.example:9000"),
            Some("http://env.example".to_string()),
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("flag.example"));
    }

    #[test]
    fn blank_values_fall_back_to_default_server() {
        let url = resolve_server(Some("  "), Some(String::new())).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn bare_host_is_treated_as_http() {
        let url = normalize_server_url("jolt.internal:8080").unwrap();
        assert_eq!(url.as_str(), "http://jolt.internal:8080/");
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = normalize_server_url("ftp://jolt.internal").unwrap_err();
        assert!(matches!(err, ApiError::Scheme(scheme) if scheme == "ftp"));
    }

    #[test]
    fn events_url_follows_server_scheme() {
        let plain = normalize_server_url("http://jolt.internal:8080").unwrap();
        assert_eq!(
            events_url(&plain).unwrap().as_str(),
            "ws://jolt.internal:8080/api/v1/tasks/events"
        );

        let secure = normalize_server_url("https://jolt.example.com/ci").unwrap();
        assert_eq!(
            events_url(&secure).unwrap().as_str(),
            "wss://jolt.example.com/ci/api/v1/tasks/events"
        );
    }
}
