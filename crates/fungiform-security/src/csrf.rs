//! Per-URL CSRF tokens.
//!
//! Every protected form gets a random token that is stored in the session
//! under a hash of the form's action URL. A session keeps only the newest
//! few tokens; the oldest is evicted when a new URL needs one. After a
//! successful validation the token for the URL is invalidated so the same
//! submission cannot be replayed.
//!
//! The session key [`SESSION_KEY`] holds a JSON list of
//! `[url_hash, hex_token]` pairs, oldest first.

use rand::RngCore;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};

use fungiform_core::settings::MAX_CSRF_TOKENS;

use crate::session::Session;

/// The session key holding the tokens.
pub const SESSION_KEY: &str = "csrf_tokens";

/// The size of a token in bytes before hex encoding.
pub const TOKEN_BYTES: usize = 10;

/// A hash identifying a URL in the token list: the first four bytes of its
/// SHA-256 digest.
pub fn csrf_url_hash(url: &str) -> u32 {
    let digest = Sha256::digest(url.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// A fresh random token, hex encoded.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compares two tokens in constant time.
pub fn tokens_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// Issues and invalidates the CSRF tokens of a session.
///
/// ```
/// use fungiform_security::csrf::CsrfTokens;
/// use fungiform_security::session::MemorySession;
///
/// let session = MemorySession::new();
/// let tokens = CsrfTokens::default();
/// let token = tokens.get_token(&session, "http://example.com/login", false);
/// assert_eq!(token.len(), 20);
/// assert_eq!(tokens.get_token(&session, "http://example.com/login", false), token);
///
/// tokens.invalidate_token(&session, "http://example.com/login");
/// assert_ne!(tokens.get_token(&session, "http://example.com/login", false), token);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrfTokens {
    pub max_tokens: usize,
}

impl Default for CsrfTokens {
    fn default() -> Self {
        Self::new(MAX_CSRF_TOKENS)
    }
}

impl CsrfTokens {
    /// A manager keeping at most `max_tokens` tokens per session.
    pub const fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens: if max_tokens == 0 { 1 } else { max_tokens },
        }
    }

    /// Returns the token for `url`, creating one if needed.
    ///
    /// An existing token is reused unless `force_update` is set. Creating a
    /// token evicts the oldest entries once the session holds
    /// [`max_tokens`](Self::max_tokens).
    pub fn get_token(&self, session: &dyn Session, url: &str, force_update: bool) -> String {
        let url_hash = csrf_url_hash(url);
        let mut result = None;
        let mut issued = false;

        session.update(SESSION_KEY, &mut |current| {
            let mut tokens = parse_tokens(current.as_ref());
            if !force_update {
                if let Some((_, token)) = tokens.iter().find(|(hash, _)| *hash == url_hash) {
                    result = Some(token.clone());
                    return current;
                }
            }

            while tokens.len() >= self.max_tokens {
                let (evicted, _) = tokens.remove(0);
                tracing::trace!(url_hash = evicted, "evicted csrf token");
            }
            let token = random_token();
            tokens.push((url_hash, token.clone()));
            result = Some(token);
            issued = true;
            Some(encode_tokens(&tokens))
        });

        if issued {
            tracing::debug!(url, url_hash, "issued csrf token");
        }
        result.unwrap_or_default()
    }

    /// Drops every token stored for `url`.
    pub fn invalidate_token(&self, session: &dyn Session, url: &str) {
        let url_hash = csrf_url_hash(url);
        let mut removed = false;

        session.update(SESSION_KEY, &mut |current| {
            let tokens = parse_tokens(current.as_ref());
            if tokens.is_empty() {
                return current;
            }
            let before = tokens.len();
            let kept: Vec<_> = tokens.into_iter().filter(|(hash, _)| *hash != url_hash).collect();
            removed = kept.len() != before;
            Some(encode_tokens(&kept))
        });

        if removed {
            tracing::debug!(url, url_hash, "invalidated csrf token");
        }
    }
}

/// Reads the token list, skipping malformed entries.
fn parse_tokens(stored: Option<&JsonValue>) -> Vec<(u32, String)> {
    let Some(JsonValue::Array(entries)) = stored else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let hash = entry.get(0)?.as_u64()?;
            let token = entry.get(1)?.as_str()?;
            Some((u32::try_from(hash).ok()?, token.to_string()))
        })
        .collect()
}

fn encode_tokens(tokens: &[(u32, String)]) -> JsonValue {
    JsonValue::Array(tokens.iter().map(|(hash, token)| json!([hash, token])).collect())
}
