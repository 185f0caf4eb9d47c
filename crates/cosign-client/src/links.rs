//! Block explorer and Safe app links printed after each step

use alloy::primitives::{Address, B256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerLinks {
    explorer_url: String,
    app_prefix: String,
}

impl ExplorerLinks {
    pub fn new(explorer_url: &str, app_prefix: &str) -> Self {
        Self {
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
            app_prefix: app_prefix.to_string(),
        }
    }

    pub fn address(&self, address: Address) -> String {
        format!("{}/address/{address}", self.explorer_url)
    }

    pub fn transaction(&self, hash: B256) -> String {
        format!("{}/tx/{hash}", self.explorer_url)
    }

    /// Safe web app page of the wallet, e.g. `https://app.safe.global/sep:0x..`
    pub fn safe_app(&self, safe: Address) -> String {
        format!("https://app.safe.global/{}:{safe}", self.app_prefix)
    }
}
