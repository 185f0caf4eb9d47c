//! Key inspection commands for the cosign CLI
//!
//! Keys are never created or stored by cosign; they come from
//! `*_PRIVATE_KEY` variables. These commands only show which of the
//! configured names resolve and to which addresses.

use cosign_keyring::{env_var_for, Keyring, KeyringError};

use crate::cli::{KeysAction, KeysCmd, ListKeysCmd, ShowKeyCmd};
use crate::Result;

/// Key management handler
pub struct KeysHandler<'a> {
    keyring: &'a dyn Keyring,
    expected: Vec<String>,
}

impl<'a> KeysHandler<'a> {
    /// `expected` lists the key names the configuration refers to
    pub fn new(keyring: &'a dyn Keyring, expected: Vec<String>) -> Self {
        Self { keyring, expected }
    }

    pub async fn handle_keys(&self, cmd: KeysCmd) -> Result<()> {
        let lines = match cmd.action {
            KeysAction::List(list_cmd) => self.list(&list_cmd).await?,
            KeysAction::Show(show_cmd) => self.show(&show_cmd).await?,
        };
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, cmd: &ListKeysCmd) -> Result<Vec<String>> {
        let keys = self.keyring.list_keys().await?;
        let mut lines = Vec::new();

        for name in &self.expected {
            match keys.iter().find(|key| &key.name == name) {
                Some(key) if cmd.address => lines.push(key.address.to_string()),
                Some(key) => lines.push(format!("- {}: {}", key.name, key.address)),
                None if cmd.address => {}
                None => lines.push(format!("- {name}: not set ({})", env_var_for(name))),
            }
        }
        for key in keys.iter().filter(|key| !self.expected.contains(&key.name)) {
            if cmd.address {
                lines.push(key.address.to_string());
            } else {
                lines.push(format!("- {}: {}", key.name, key.address));
            }
        }

        Ok(lines)
    }

    #[tracing::instrument(skip(self))]
    async fn show(&self, cmd: &ShowKeyCmd) -> Result<Vec<String>> {
        let key = self.keyring.get_key(&cmd.name).await.map_err(|e| match e {
            KeyringError::KeyNotFound(_) => {
                KeyringError::KeyNotFound(format!("{} (set {})", cmd.name, env_var_for(&cmd.name)))
            }
            other => other,
        })?;

        if cmd.address {
            Ok(vec![key.address().to_string()])
        } else {
            Ok(vec![
                format!("name:    {}", key.name()),
                format!("address: {}", key.address()),
                format!("source:  {}", env_var_for(key.name())),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use cosign_keyring::MemoryKeyring;

    async fn keyring() -> MemoryKeyring {
        let mut keyring = MemoryKeyring::new();
        keyring
            .import_private_key(
                "owner1",
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            )
            .await
            .unwrap();
        keyring
    }

    #[tokio::test]
    async fn test_list_marks_missing_keys() {
        let keyring = keyring().await;
        let handler = KeysHandler::new(&keyring, vec!["owner1".into(), "owner2".into()]);

        let lines = handler.list(&ListKeysCmd { address: false }).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- owner1: 0x"));
        assert_eq!(lines[1], "- owner2: not set (OWNER_2_PRIVATE_KEY)");

        let addresses = handler.list(&ListKeysCmd { address: true }).await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(
            addresses[0].to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[tokio::test]
    async fn test_show_unknown_key_names_variable() {
        let keyring = keyring().await;
        let handler = KeysHandler::new(&keyring, vec![]);

        let err = handler
            .show(&ShowKeyCmd {
                name: "owner4".into(),
                address: false,
            })
            .await
            .unwrap_err();
        match err {
            ClientError::Keyring(KeyringError::KeyNotFound(msg)) => {
                assert!(msg.contains("OWNER_4_PRIVATE_KEY"))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let lines = handler
            .show(&ShowKeyCmd {
                name: "owner1".into(),
                address: false,
            })
            .await
            .unwrap();
        assert_eq!(lines.len(), 3);
    }
}
