//! Telegram WebApp launch data verification.
//!
//! A Mini-App receives `initData` as a URL-encoded query string signed by
//! Telegram with a key derived from the bot token:
//!
//! ```text
//! secret_key = HMAC-SHA256(key = "WebAppData", msg = bot_token)
//! hash       = hex(HMAC-SHA256(key = secret_key, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every field except `hash`, sorted by key and
//! joined as `key=value` lines.
//!
//! All rejections look identical to the caller. The reason is emitted at
//! debug level only, without payload content.

use chrono::{DateTime, Utc};
use courier_crypto::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the WebApp secret from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Default maximum age of launch data, in seconds.
pub const DEFAULT_MAX_AGE_SECONDS: u32 = 300;

/// How far in the future `auth_date` may be before it is rejected.
pub const CLOCK_SKEW_SECONDS: i64 = 30;

/// The Telegram user embedded in launch data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramIdentity {
    /// Telegram user id.
    pub id: u64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: Option<bool>,
}

impl TelegramIdentity {
    /// Returns the Telegram id as the external identity string.
    #[must_use]
    pub fn external_id(&self) -> String {
        self.id.to_string()
    }
}

/// Launch data that passed signature and freshness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    /// The parsed `user` field, if present.
    pub user: Option<TelegramIdentity>,
    /// When Telegram signed the payload.
    pub auth_date: DateTime<Utc>,
    /// The verified hash.
    pub hash: String,
    /// Every other field (`query_id`, `start_param`, `chat_type`, ...).
    pub fields: BTreeMap<String, String>,
}

/// Internal rejection reasons, logged but never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    DuplicateField,
    MissingHash,
    HashMismatch,
    BadAuthDate,
    Expired,
    FromTheFuture,
    BadUser,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateField => "duplicate_field",
            Self::MissingHash => "missing_hash",
            Self::HashMismatch => "hash_mismatch",
            Self::BadAuthDate => "bad_auth_date",
            Self::Expired => "expired",
            Self::FromTheFuture => "from_the_future",
            Self::BadUser => "bad_user",
        }
    }
}

/// Verifies launch data against one bot token.
///
/// The derived secret key is computed once at construction.
#[derive(Clone)]
pub struct InitDataVerifier {
    secret_key: [u8; 32],
    max_age_seconds: u32,
}

impl InitDataVerifier {
    /// Creates a verifier for `bot_token`.
    #[must_use]
    pub fn new(bot_token: &[u8], max_age_seconds: u32) -> Self {
        Self {
            secret_key: derive_secret_key(bot_token),
            max_age_seconds,
        }
    }

    /// Verifies `raw` against the current time.
    #[must_use]
    pub fn verify(&self, raw: &str) -> Option<VerifiedInitData> {
        self.verify_at(raw, Utc::now())
    }

    /// Verifies `raw` as if the current time were `now`.
    #[must_use]
    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Option<VerifiedInitData> {
        match self.check(raw, now) {
            Ok(data) => Some(data),
            Err(rejection) => {
                tracing::debug!(reason = rejection.as_str(), "init data rejected");
                None
            }
        }
    }

    fn check(&self, raw: &str, now: DateTime<Utc>) -> Result<VerifiedInitData, Rejection> {
        let mut fields = parse_fields(raw)?;
        let hash = fields.remove("hash").ok_or(Rejection::MissingHash)?;

        let expected = sign_fields(&self.secret_key, &fields);
        if !constant_time_eq(expected.as_bytes(), hash.as_bytes()) {
            return Err(Rejection::HashMismatch);
        }

        let auth_date = fields
            .remove("auth_date")
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(Rejection::BadAuthDate)?;
        let age = now
            .timestamp()
            .checked_sub(auth_date)
            .ok_or(Rejection::BadAuthDate)?;
        if age > i64::from(self.max_age_seconds) {
            return Err(Rejection::Expired);
        }
        if age < -CLOCK_SKEW_SECONDS {
            return Err(Rejection::FromTheFuture);
        }
        let auth_date = DateTime::from_timestamp(auth_date, 0).ok_or(Rejection::BadAuthDate)?;

        let user = match fields.remove("user") {
            Some(json) => Some(
                serde_json::from_str::<TelegramIdentity>(&json).map_err(|_| Rejection::BadUser)?,
            ),
            None => None,
        };

        Ok(VerifiedInitData {
            user,
            auth_date,
            hash,
            fields,
        })
    }
}

impl std::fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("max_age_seconds", &self.max_age_seconds)
            .finish_non_exhaustive()
    }
}

/// One-shot verification, for callers without a long-lived verifier.
#[must_use]
pub fn verify_init_data(
    raw: &str,
    bot_token: &[u8],
    max_age_seconds: u32,
) -> Option<VerifiedInitData> {
    InitDataVerifier::new(bot_token, max_age_seconds).verify(raw)
}

/// Builds a signed launch payload the way Telegram does.
///
/// Used by tests and by local tooling that needs to impersonate a client.
#[must_use]
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &[u8]) -> String {
    let map: BTreeMap<String, String> = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let hash = sign_fields(&derive_secret_key(bot_token), &map);

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

fn derive_secret_key(bot_token: &[u8]) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(WEB_APP_DATA_KEY).expect("HMAC accepts keys of any length");
    mac.update(bot_token);
    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

fn sign_fields(secret_key: &[u8; 32], fields: &BTreeMap<String, String>) -> String {
    let check_string = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts keys of any length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn parse_fields(raw: &str) -> Result<BTreeMap<String, String>, Rejection> {
    let mut fields = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if fields.insert(key.into_owned(), value.into_owned()).is_some() {
            return Err(Rejection::DuplicateField);
        }
    }
    Ok(fields)
}
