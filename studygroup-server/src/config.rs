use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Name of the SQLite database file inside `state_dir`.
pub const DATABASE_FILE: &str = "studygroups.db";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Lifetime of a login session, in days.
    pub session_ttl_days: i64,
    /// Whether the session cookie carries the `Secure` attribute. Turn off
    /// only for plain-HTTP local development.
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let session_ttl_days = parse_session_ttl_days(env::var("SESSION_TTL_DAYS").ok())?;

        let cookie_secure = env::var("COOKIE_SECURE")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .context("COOKIE_SECURE must be true or false")?;

        Ok(Config {
            port,
            state_dir,
            session_ttl_days,
            cookie_secure,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join(DATABASE_FILE)
    }
}

/// Longest session lifetime accepted from the environment.
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Parse SESSION_TTL_DAYS, defaulting to 7.
pub fn parse_session_ttl_days(value: Option<String>) -> Result<i64> {
    let Some(value) = value.filter(|s| !s.trim().is_empty()) else {
        return Ok(7);
    };
    let days = value
        .trim()
        .parse::<i64>()
        .context("SESSION_TTL_DAYS must be a valid number")?;
    if days < 1 {
        bail!("SESSION_TTL_DAYS must be at least 1, got {}", days);
    }
    if days > MAX_SESSION_TTL_DAYS {
        bail!(
            "SESSION_TTL_DAYS must be at most {}, got {}",
            MAX_SESSION_TTL_DAYS,
            days
        );
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ttl_defaults_to_a_week() {
        assert_eq!(parse_session_ttl_days(None).unwrap(), 7);
        assert_eq!(parse_session_ttl_days(Some("  ".to_string())).unwrap(), 7);
    }

    #[test]
    fn test_session_ttl_parses_value() {
        assert_eq!(parse_session_ttl_days(Some("30".to_string())).unwrap(), 30);
    }

    #[test]
    fn test_session_ttl_rejects_zero_and_garbage() {
        assert!(parse_session_ttl_days(Some("0".to_string())).is_err());
        assert!(parse_session_ttl_days(Some("-3".to_string())).is_err());
        assert!(parse_session_ttl_days(Some("week".to_string())).is_err());
    }

    #[test]
    fn test_session_ttl_upper_bound() {
        assert_eq!(
            parse_session_ttl_days(Some("3650".to_string())).unwrap(),
            MAX_SESSION_TTL_DAYS
        );
        assert!(parse_session_ttl_days(Some("3651".to_string())).is_err());
        assert!(parse_session_ttl_days(Some("1000000000".to_string())).is_err());
        assert!(parse_session_ttl_days(Some("99999999999999999999".to_string())).is_err());
    }

    #[test]
    fn test_database_path_is_inside_state_dir() {
        let config = Config {
            port: 3000,
            state_dir: PathBuf::from("/var/lib/studygroups"),
            session_ttl_days: 7,
            cookie_secure: true,
        };
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/studygroups/studygroups.db")
        );
    }
}
