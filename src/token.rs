/// Opaque token generation and account-identifier hashing
///
/// Tokens are random hex strings compared only by exact equality; nothing in
/// the system ever parses one.
use sha2::{Digest, Sha256};

/// Number of random bytes in every minted token
pub const TOKEN_BYTES: usize = 32;

/// Generate an opaque random token (64 hex chars)
pub fn generate_token() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Privacy-preserving hash of a normalized account identifier
///
/// Sync requests are keyed by this hash so the raw address never appears in
/// query strings or request logs.
pub fn account_hash(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize an account identifier: trim and lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
