use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

pub const DEFAULT_FADEOUT_SECONDS: u32 = 5;
const SESSION_TOKEN_MAX_LEN: usize = 255;

/// Opaque bearer token identifying an anonymous visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() || value.len() > SESSION_TOKEN_MAX_LEN {
            return Err(anyhow!("session token must be 1 to 255 characters"));
        }
        let valid = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(anyhow!("session token contains invalid characters"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

/// Who a notification belongs to. Exactly one discriminant, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    User(i64),
    Session(SessionToken),
}

impl Owner {
    /// Guest notifications clean themselves up unless told otherwise.
    pub fn default_delete_after_read(&self) -> bool {
        matches!(self, Owner::Session(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Owner::User(_) => None,
            Owner::Session(token) => Some(token.as_str()),
        }
    }

    pub fn from_columns(user_id: Option<i64>, session_id: Option<String>) -> Result<Self> {
        match (user_id, session_id) {
            (Some(user_id), None) => Ok(Owner::User(user_id)),
            (None, Some(session_id)) => Ok(Owner::Session(SessionToken::parse(&session_id)?)),
            (Some(_), Some(_)) => Err(anyhow!("notification has both user_id and session_id")),
            (None, None) => Err(anyhow!("notification has neither user_id nor session_id")),
        }
    }
}

/// Dismissal policy: click only, or automatically after a number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fadeout {
    Never,
    Seconds(NonZeroU32),
}

impl Fadeout {
    pub fn seconds(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Fadeout::Seconds)
    }

    pub fn as_duration(&self) -> Option<std::time::Duration> {
        match self {
            Fadeout::Never => None,
            Fadeout::Seconds(secs) => Some(std::time::Duration::from_secs(u64::from(secs.get()))),
        }
    }
}

impl Default for Fadeout {
    fn default() -> Self {
        match NonZeroU32::new(DEFAULT_FADEOUT_SECONDS) {
            Some(secs) => Fadeout::Seconds(secs),
            None => Fadeout::Never,
        }
    }
}

impl fmt::Display for Fadeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fadeout::Never => f.write_str("never"),
            Fadeout::Seconds(secs) => write!(f, "{}", secs),
        }
    }
}

impl FromStr for Fadeout {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("never") {
            return Ok(Fadeout::Never);
        }
        let secs: u32 = value
            .parse()
            .map_err(|_| anyhow!("fadeout must be \"never\" or a positive number of seconds"))?;
        Fadeout::seconds(secs).ok_or_else(|| anyhow!("fadeout must be greater than zero"))
    }
}

impl Serialize for Fadeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Fadeout::Never => serializer.serialize_str("never"),
            Fadeout::Seconds(secs) => serializer.serialize_u32(secs.get()),
        }
    }
}

impl<'de> Deserialize<'de> for Fadeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(secs) => u32::try_from(secs)
                .ok()
                .and_then(Fadeout::seconds)
                .ok_or_else(|| serde::de::Error::custom("fadeout must be a positive number of seconds")),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub owner: Owner,
    pub message: String,
    pub fadeout: Fadeout,
    pub delete_after_read: bool,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

/// Creation request. Unset options fall back to the owner's defaults.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub owner: Owner,
    pub message: String,
    pub fadeout: Fadeout,
    pub delete_after_read: bool,
}

impl NewNotification {
    pub fn new(owner: Owner, message: impl Into<String>) -> Self {
        let delete_after_read = owner.default_delete_after_read();
        Self {
            owner,
            message: message.into(),
            fadeout: Fadeout::default(),
            delete_after_read,
        }
    }

    pub fn fadeout(mut self, fadeout: Fadeout) -> Self {
        self.fadeout = fadeout;
        self
    }

    pub fn delete_after_read(mut self, delete_after_read: bool) -> Self {
        self.delete_after_read = delete_after_read;
        self
    }
}

/// What acknowledging a notification did to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    Deleted,
    MarkedRead,
    NotFound,
}
