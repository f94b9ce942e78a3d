use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

/// A login token as persisted. Only the digest of the issued value is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub id: i64,
    pub token_hash: String,
    pub user_id: i64,
    pub creation_time: DateTime<Utc>,
}

impl Token {
    /// Saturates at the latest representable instant.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.creation_time
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Valid while `creation_time >= now - ttl`; never extended.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match now.checked_sub_signed(ttl) {
            Some(cutoff) => self.creation_time >= cutoff,
            // The cutoff lies before the earliest representable instant.
            None => true,
        }
    }
}
