//! Random short-id generation for groups.

#![allow(dead_code)]

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphanumeric alphabet; no underscore, so generated ids can never enter
/// the reserved `user_` namespace.
pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default id length
pub const DEFAULT_LENGTH: usize = 6;

/// Attempts before giving up on finding a free id
pub const MAX_ATTEMPTS: usize = 10;

/// Alphabet and length for generated short ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortIdConfig {
    pub alphabet: String,
    pub length: usize,
}

impl Default for ShortIdConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            length: DEFAULT_LENGTH,
        }
    }
}

/// Draws one candidate id from the configured alphabet
pub fn random_short_id(config: &ShortIdConfig) -> String {
    let chars: Vec<char> = config.alphabet.chars().collect();
    let mut rng = rand::thread_rng();
    (0..config.length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}
