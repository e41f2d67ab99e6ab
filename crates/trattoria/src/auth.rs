//! Password collaborator.
//!
//! The store only ever sees the opaque output of [`PasswordHasher::hash`]. The
//! default [`SaltedSha256`] stores `salt$hex(sha256(salt || password))`.

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub trait PasswordHasher {
    fn hash(&self, plain: &str) -> String;
    fn verify(&self, plain: &str, hashed: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaltedSha256;

impl SaltedSha256 {
    fn digest(salt: &str, plain: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(plain.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordHasher for SaltedSha256 {
    fn hash(&self, plain: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        format!("{}${}", salt, Self::digest(&salt, plain))
    }

    fn verify(&self, plain: &str, hashed: &str) -> bool {
        match hashed.split_once('$') {
            Some((salt, expected)) => {
                let actual = Self::digest(salt, plain);
                constant_time_eq(actual.as_bytes(), expected.as_bytes())
            }
            None => false,
        }
    }
}
