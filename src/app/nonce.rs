use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Action every tray request is signed for.
pub const NOTIFICATION_NONCE_ACTION: &str = "notification_nonce";

const NONCE_HEX_LEN: usize = 20;

/// Time-ticked request nonces. A nonce stays valid for the tick it was issued
/// in and the one after, so its usable life is between half and all of
/// `lifetime_seconds`.
#[derive(Clone)]
pub struct NonceService {
    key: [u8; 32],
    lifetime_seconds: u64,
}

impl NonceService {
    pub fn new(key: [u8; 32], lifetime_seconds: u64) -> Self {
        Self {
            key,
            lifetime_seconds: lifetime_seconds.max(2),
        }
    }

    pub fn create(&self, action: &str, uid: i64) -> Result<String> {
        self.create_at(action, uid, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn verify(&self, action: &str, uid: i64, nonce: &str) -> bool {
        self.verify_at(action, uid, nonce, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn create_at(&self, action: &str, uid: i64, unix_seconds: i64) -> Result<String> {
        self.sign(self.tick(unix_seconds), action, uid)
    }

    pub fn verify_at(&self, action: &str, uid: i64, nonce: &str, unix_seconds: i64) -> bool {
        let nonce = nonce.trim();
        if nonce.len() != NONCE_HEX_LEN {
            return false;
        }

        let tick = self.tick(unix_seconds);
        [tick, tick - 1].into_iter().any(|candidate| {
            match self.sign(candidate, action, uid) {
                Ok(expected) => bool::from(expected.as_bytes().ct_eq(nonce.as_bytes())),
                Err(err) => {
                    tracing::error!(error = ?err, "failed to compute nonce");
                    false
                }
            }
        })
    }

    fn tick(&self, unix_seconds: i64) -> i64 {
        let half = (self.lifetime_seconds / 2) as i64;
        (unix_seconds + half - 1).div_euclid(half)
    }

    fn sign(&self, tick: i64, action: &str, uid: i64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| anyhow!("invalid nonce key: {}", err))?;
        mac.update(format!("{}|{}|{}", tick, action, uid).as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        Ok(digest[..NONCE_HEX_LEN].to_string())
    }
}
