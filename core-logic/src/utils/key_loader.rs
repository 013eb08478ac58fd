use crate::error::{ConfigError, WalletError};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A raw private key read from disk. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RawKey(String);

impl RawKey {
    pub fn new(key: impl Into<String>) -> Result<Self, WalletError> {
        let key: String = key.into();
        let hex_part = key.strip_prefix("0x").unwrap_or(&key);

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidKeyFormat);
        }
        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                length: hex_part.len(),
            });
        }

        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawKey(***REDACTED***)")
    }
}

/// Loader for newline-delimited private key files (`pk.txt`).
pub struct KeyFileLoader;

impl KeyFileLoader {
    pub const KEY_FILE: &'static str = "pk.txt";

    /// Reads every non-empty, non-comment line as a private key.
    ///
    /// Lines that are not 32-byte hex keys are reported in the second element
    /// together with their 1-based line number, so the caller decides how loud
    /// to be about them.
    pub fn load_from(
        path: impl AsRef<Path>,
    ) -> Result<(Vec<RawKey>, Vec<(usize, WalletError)>), ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;

        let (keys, rejected) = Self::parse(&content);
        info!("Loaded {} keys from {}", keys.len(), path.display());
        Ok((keys, rejected))
    }

    pub fn parse(content: &str) -> (Vec<RawKey>, Vec<(usize, WalletError)>) {
        let mut keys = Vec::new();
        let mut rejected = Vec::new();

        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match RawKey::new(trimmed) {
                Ok(key) => keys.push(key),
                Err(e) => rejected.push((i + 1, e)),
            }
        }

        (keys, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let content = format!("\n{}\n   \n# note\n{}\n", KEY, &KEY[2..]);
        let (keys, rejected) = KeyFileLoader::parse(&content);
        assert_eq!(keys.len(), 2);
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        let (keys, rejected) = KeyFileLoader::parse("0x1234\nnot-a-key\n");
        assert!(keys.is_empty());
        assert_eq!(rejected.len(), 2);
        assert!(matches!(
            rejected[0],
            (1, WalletError::InvalidKeyLength { length: 4 })
        ));
        assert!(matches!(rejected[1], (2, WalletError::InvalidKeyFormat)));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = RawKey::new(KEY).unwrap();
        assert!(!format!("{:?}", key).contains("4c0883"));
    }
}
