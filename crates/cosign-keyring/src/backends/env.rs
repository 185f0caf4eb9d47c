use async_trait::async_trait;
use std::collections::HashMap;

use crate::{KeyInfo, Keyring, KeyringError, OwnerKey};

/// Environment variable holding the private key for `name`.
///
/// `ownerN` maps to `OWNER_N_PRIVATE_KEY`, so `owner1` reads
/// `OWNER_1_PRIVATE_KEY`. Any other name is upper-cased with `-` turned into
/// `_`, so `funder` reads `FUNDER_PRIVATE_KEY`.
pub fn env_var_for(name: &str) -> String {
    if let Some(index) = name.strip_prefix("owner") {
        if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
            return format!("OWNER_{index}_PRIVATE_KEY");
        }
    }
    format!("{}_PRIVATE_KEY", name.to_ascii_uppercase().replace('-', "_"))
}

/// Read-only keyring backed by `*_PRIVATE_KEY` variables
///
/// Keys are resolved when asked for, so a missing variable only fails the
/// step that needs it.
#[derive(Debug, Clone, Default)]
pub struct EnvKeyring {
    names: Vec<String>,
    vars: HashMap<String, String>,
}

impl EnvKeyring {
    /// Snapshot the process environment for the given key names
    pub fn from_env<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let vars = names
            .iter()
            .filter_map(|name| {
                let var = env_var_for(name);
                std::env::var(&var).ok().map(|value| (var, value))
            })
            .collect();
        Self { names, vars }
    }

    /// Build from an explicit variable map
    pub fn from_vars<I, S>(names: I, vars: HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            vars,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[async_trait]
impl Keyring for EnvKeyring {
    async fn get_key(&self, name: &str) -> Result<OwnerKey, KeyringError> {
        let var = env_var_for(name);
        let value = self
            .vars
            .get(&var)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| KeyringError::KeyNotFound(format!("{name} (set {var})")))?;
        OwnerKey::from_private_key(name, value)
    }

    async fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        let mut keys = Vec::new();
        for name in &self.names {
            match self.get_key(name).await {
                Ok(key) => keys.push(key.info()),
                Err(KeyringError::KeyNotFound(_)) => {
                    tracing::debug!(key = %name, "key not configured");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(keys)
    }

    async fn import_private_key(
        &mut self,
        name: &str,
        _private_key_hex: &str,
    ) -> Result<KeyInfo, KeyringError> {
        Err(KeyringError::BackendError(format!(
            "environment keyring is read-only, export {} instead",
            env_var_for(name)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER1: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn keyring() -> EnvKeyring {
        let vars = HashMap::from([("OWNER_1_PRIVATE_KEY".to_string(), OWNER1.to_string())]);
        EnvKeyring::from_vars(["owner1", "owner2"], vars)
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(env_var_for("owner1"), "OWNER_1_PRIVATE_KEY");
        assert_eq!(env_var_for("owner12"), "OWNER_12_PRIVATE_KEY");
        assert_eq!(env_var_for("funder"), "FUNDER_PRIVATE_KEY");
        assert_eq!(env_var_for("hot-wallet"), "HOT_WALLET_PRIVATE_KEY");
        assert_eq!(env_var_for("owner"), "OWNER_PRIVATE_KEY");
    }

    #[tokio::test]
    async fn test_get_key_resolves_configured_variable() {
        let key = keyring().get_key("owner1").await.unwrap();
        assert_eq!(
            key.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[tokio::test]
    async fn test_missing_variable_is_key_not_found() {
        let err = keyring().get_key("owner2").await.unwrap_err();
        match err {
            KeyringError::KeyNotFound(msg) => assert!(msg.contains("OWNER_2_PRIVATE_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_skips_unconfigured_keys() {
        let keys = keyring().list_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "owner1");
    }

    #[tokio::test]
    async fn test_is_read_only() {
        let mut keyring = keyring();
        assert!(matches!(
            keyring.import_private_key("owner2", OWNER1).await,
            Err(KeyringError::BackendError(_))
        ));
    }
}
