use crate::domain::notification::{NewNotification, Owner, SessionToken};

pub const SESSION_COOKIE_NAME: &str = "notification_session";
pub const SESSION_COOKIE_MAX_AGE_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(i64),
    Anonymous(SessionToken),
}

impl Identity {
    pub fn owner(&self) -> Owner {
        match self {
            Identity::Authenticated(user_id) => Owner::User(*user_id),
            Identity::Anonymous(token) => Owner::Session(token.clone()),
        }
    }

    /// Guests all share uid 0 for nonce purposes.
    pub fn nonce_uid(&self) -> i64 {
        match self {
            Identity::Authenticated(user_id) => *user_id,
            Identity::Anonymous(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    /// Set when a new guest token was minted and must be sent to the client.
    pub issued: Option<SessionToken>,
}

impl ResolvedIdentity {
    pub fn set_cookie(&self) -> Option<String> {
        self.issued.as_ref().map(session_cookie)
    }

    /// A notification for the current caller with the owner's defaults. When
    /// a guest token was just minted, `set_cookie()` has to reach the client
    /// or the notification can never be delivered.
    pub fn notify(&self, message: impl Into<String>) -> NewNotification {
        NewNotification::new(self.identity.owner(), message)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// An authenticated user wins; otherwise reuse the guest cookie, minting
    /// one when it is missing or malformed.
    pub fn resolve(&self, user_id: Option<i64>, cookie_header: Option<&str>) -> ResolvedIdentity {
        if let Some(user_id) = user_id {
            return ResolvedIdentity {
                identity: Identity::Authenticated(user_id),
                issued: None,
            };
        }

        let existing = cookie_header
            .and_then(read_session_cookie)
            .and_then(|value| SessionToken::parse(value).ok());

        match existing {
            Some(token) => ResolvedIdentity {
                identity: Identity::Anonymous(token),
                issued: None,
            },
            None => {
                let token = SessionToken::generate();
                tracing::debug!(session_id = %token, "issued guest session token");
                ResolvedIdentity {
                    identity: Identity::Anonymous(token.clone()),
                    issued: Some(token),
                }
            }
        }
    }
}

pub fn read_session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_COOKIE_NAME)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

pub fn session_cookie(token: &SessionToken) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE_NAME, token, SESSION_COOKIE_MAX_AGE_SECONDS
    )
}
