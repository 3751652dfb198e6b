use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use crate::config::APP_NAME;

use super::SessionState;

/// Persists the session's token pair in the OS keychain between runs.
///
/// Passwords are never stored here, only the tokens the backend issued.
pub struct TokenStore {
    profile: String,
}

impl TokenStore {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(APP_NAME, &self.profile).context("Failed to create keyring entry")
    }

    /// Store the session in the keychain
    pub fn save(&self, session: &SessionState) -> Result<()> {
        let contents = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store session in keychain")?;
        debug!(profile = %self.profile, "Session saved to keychain");
        Ok(())
    }

    /// Load a stored session, if any
    pub fn load(&self) -> Result<Option<SessionState>> {
        match self.entry()?.get_password() {
            Ok(contents) => {
                let session: SessionState =
                    serde_json::from_str(&contents).context("Failed to parse stored session")?;
                Ok(Some(session.normalized()).filter(SessionState::is_active))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    /// Remove the stored session. Succeeds when nothing was stored.
    pub fn delete(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }

    /// Save an active session, or remove the stored one when inactive
    pub fn sync(&self, session: &SessionState) -> Result<()> {
        if session.is_active() {
            self.save(session)
        } else {
            self.delete()
        }
    }
}
