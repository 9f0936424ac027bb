//! Password and token hashing.
//!
//! Stored passwords look like `sha256$<salt hex>$<digest hex>` where the digest is
//! SHA-256 over the salt followed by the UTF-8 password.

use rand::Rng;
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

pub fn hash_password(plain: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    format!("{}${}${}", SCHEME, hex::encode(salt), salted_digest(&salt, plain))
}

pub fn verify_password(plain: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(SCHEME), Some(salt_hex), Some(digest)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    match hex::decode(salt_hex) {
        Ok(salt) => salted_digest(&salt, plain) == digest,
        Err(_) => false,
    }
}

fn salted_digest(salt: &[u8], plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of arbitrary text.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Fresh random token (CSRF, recovery).
pub fn random_token() -> String {
    let seed: [u8; 8] = rand::random();
    sha256_hex(&seed)
}
