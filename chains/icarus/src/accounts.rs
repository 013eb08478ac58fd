use anyhow::Result;
use core_logic::{KeyFileLoader, RawKey, WalletError};
use ethers::prelude::*;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::tokens::short_address;

/// A loaded wallet. Immutable for the lifetime of the process.
#[derive(Clone)]
pub struct Account {
    wallet: LocalWallet,
}

impl Account {
    pub fn from_key(key: &RawKey) -> Result<Self, WalletError> {
        let hex_part = key.expose().trim_start_matches("0x");
        let wallet = LocalWallet::from_str(hex_part).map_err(|_| WalletError::InvalidKeyFormat)?;
        Ok(Self { wallet })
    }

    pub fn from_wallet(wallet: LocalWallet) -> Self {
        Self { wallet }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &short_address(&self.address()))
            .finish()
    }
}

/// Reads `path` and derives one account per valid key. Unusable lines are
/// skipped with a warning; a missing file is an error.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>> {
    let (keys, rejected) = KeyFileLoader::load_from(path.as_ref())?;

    for (line, err) in &rejected {
        warn!("Skipping key on line {}: {}", line, err);
    }

    let mut accounts = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        match Account::from_key(key) {
            Ok(account) => accounts.push(account),
            Err(e) => warn!("Skipping key #{}: {}", i + 1, e),
        }
    }

    info!("Loaded {} accounts from {}", accounts.len(), path.as_ref().display());
    Ok(accounts)
}
