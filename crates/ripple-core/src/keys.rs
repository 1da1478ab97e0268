//! Write-capability secret.
//!
//! The secret gates the only operation that writes into a node's sandbox.
//! It is never sent to other nodes during a flood.

use std::fmt;

use rand::Rng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::DEFAULT_SECRET_LENGTH;

/// Shared write-capability secret.
#[derive(Clone)]
pub struct WriteSecret(String);

impl WriteSecret {
    /// Creates a secret from its textual form.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Generates a random secret of lowercase ASCII letters.
    pub fn random() -> Self {
        Self::random_with_length(DEFAULT_SECRET_LENGTH)
    }

    /// Generates a random secret with the given number of characters.
    pub fn random_with_length(length: usize) -> Self {
        let mut rng = rand::thread_rng();
        let secret = (0..length)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        Self(secret)
    }

    /// Returns the secret text.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compares against a presented secret in constant time.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for WriteSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteSecret([REDACTED])")
    }
}

impl PartialEq for WriteSecret {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for WriteSecret {}

impl From<&str> for WriteSecret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Zeroizes the secret on drop.
impl Drop for WriteSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
