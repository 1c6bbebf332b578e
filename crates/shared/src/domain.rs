use std::fmt;

use serde::{Deserialize, Serialize};

pub const ACCOUNT_PREFIX_LEN: usize = 6;
pub const ACCOUNT_SUFFIX_LEN: usize = 4;
pub const TX_HASH_PREFIX_LEN: usize = 10;
pub const TX_HASH_SUFFIX_LEN: usize = 8;

macro_rules! hex_string_newtype {
    ($name:ident, $prefix:expr, $suffix:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Short display form, `0x1234...abcd` style.
            pub fn abbreviated(&self) -> String {
                abbreviate(&self.0, $prefix, $suffix)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

hex_string_newtype!(Account, ACCOUNT_PREFIX_LEN, ACCOUNT_SUFFIX_LEN);
hex_string_newtype!(TxHash, TX_HASH_PREFIX_LEN, TX_HASH_SUFFIX_LEN);

impl TxHash {
    pub fn explorer_url(&self, explorer_tx_base: &str) -> String {
        format!("{}/{}", explorer_tx_base.trim_end_matches('/'), self.0)
    }
}

/// Keeps the first `prefix` and last `suffix` characters joined by `...`.
/// Values too short to shorten are returned unchanged.
pub fn abbreviate(value: &str, prefix: usize, suffix: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= prefix + suffix {
        return value.to_string();
    }
    let head: String = chars[..prefix].iter().collect();
    let tail: String = chars[chars.len() - suffix..].iter().collect();
    format!("{head}...{tail}")
}
