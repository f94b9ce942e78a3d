use chrono::Duration;

use crate::errors::AppError;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
/// Ten years. Larger windows push `now - ttl` out of the representable date range.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 3600;
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Fixed lifetime of a login token, counted from its creation.
    pub token_ttl: Duration,
    /// Role every newly registered user receives.
    pub default_role: String,
    /// Whether the seeded read rights are restricted to the caller's own resources.
    pub seed_read_only_own: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            default_role: DEFAULT_ROLE.to_string(),
            seed_read_only_own: true,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let ttl_seconds = lookup("TOKEN_TTL_SECONDS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(DEFAULT_TOKEN_TTL_SECONDS))
            .map_err(|_| AppError::configuration("TOKEN_TTL_SECONDS must be a valid integer"))?;
        if ttl_seconds <= 0 {
            return Err(AppError::configuration("TOKEN_TTL_SECONDS must be positive"));
        }
        if ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(AppError::configuration(format!(
                "TOKEN_TTL_SECONDS must be at most {MAX_TOKEN_TTL_SECONDS}"
            )));
        }
        let token_ttl = Duration::try_seconds(ttl_seconds)
            .ok_or_else(|| AppError::configuration("TOKEN_TTL_SECONDS is out of range"))?;

        let default_role = lookup("DEFAULT_ROLE")
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let seed_read_only_own = match lookup("SEED_READ_ONLY_OWN") {
            Some(val) => parse_bool(&val)
                .ok_or_else(|| AppError::configuration("SEED_READ_ONLY_OWN must be true or false"))?,
            None => true,
        };

        Ok(Self {
            token_ttl,
            default_role,
            seed_read_only_own,
        })
    }

    pub fn with_seed_read_only_own(mut self, only_own: bool) -> Self {
        self.seed_read_only_own = only_own;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
