pub mod auth;
pub mod identity;
pub mod nonce;
pub mod notifications;
