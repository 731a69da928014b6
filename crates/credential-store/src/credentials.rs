//! The credential pair and its store.

use crate::{PreferenceStorage, SecureStorage, StorageKeys, StorageResult};
use observability::redact;
use std::fmt;
use tracing::{debug, error, warn};

/// Access and refresh token issued together by the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Secure credential pair plus the biometric opt-in flag.
///
/// The two tokens are written and cleared as one unit: a failure halfway
/// through restores whatever was there before, so the secure store never
/// holds one token from a new pair next to one from an old pair.
pub struct CredentialStore {
    secrets: Box<dyn SecureStorage>,
    preferences: Box<dyn PreferenceStorage>,
}

/// Value of one secret slot captured before a pair mutation.
type Staged = Option<String>;

impl CredentialStore {
    pub fn new(secrets: Box<dyn SecureStorage>, preferences: Box<dyn PreferenceStorage>) -> Self {
        Self {
            secrets,
            preferences,
        }
    }

    /// Persist both tokens, or neither.
    pub fn save(&self, credential: &Credential) -> StorageResult<()> {
        let previous_access = self.secrets.get(StorageKeys::ACCESS_TOKEN)?;
        let previous_refresh = self.secrets.get(StorageKeys::REFRESH_TOKEN)?;

        self.secrets
            .set(StorageKeys::ACCESS_TOKEN, &credential.access_token)?;

        if let Err(e) = self
            .secrets
            .set(StorageKeys::REFRESH_TOKEN, &credential.refresh_token)
        {
            warn!(error = %e, "Refresh token write failed, rolling back access token");
            self.restore_slot(StorageKeys::ACCESS_TOKEN, previous_access, &previous_refresh);
            return Err(e);
        }

        debug!(
            access_token = %redact(&credential.access_token),
            refresh_token = %redact(&credential.refresh_token),
            "Credential saved"
        );
        Ok(())
    }

    /// Read a single secret. Unset keys and unreadable storage both read as
    /// absent; the latter is logged.
    pub fn read(&self, key: &str) -> Option<String> {
        match self.secrets.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Secure storage read failed, treating as absent");
                None
            }
        }
    }

    /// Delete a single secret. Deleting an absent key succeeds.
    pub fn delete(&self, key: &str) -> StorageResult<()> {
        let removed = self.secrets.delete(key)?;
        debug!(key = %key, removed, "Secret deleted");
        Ok(())
    }

    /// The stored pair, if both halves are readable.
    pub fn credential(&self) -> Option<Credential> {
        let access = self.read(StorageKeys::ACCESS_TOKEN);
        let refresh = self.read(StorageKeys::REFRESH_TOKEN);
        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Some(Credential {
                access_token,
                refresh_token,
            }),
            (None, None) => None,
            _ => {
                warn!("Only one half of the credential pair is readable, treating as absent");
                None
            }
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// Remove both tokens, or neither.
    pub fn clear_credential(&self) -> StorageResult<()> {
        let previous_access = self.secrets.get(StorageKeys::ACCESS_TOKEN)?;
        let previous_refresh = self.secrets.get(StorageKeys::REFRESH_TOKEN)?;

        self.secrets.delete(StorageKeys::ACCESS_TOKEN)?;

        if let Err(e) = self.secrets.delete(StorageKeys::REFRESH_TOKEN) {
            warn!(error = %e, "Refresh token delete failed, restoring access token");
            self.restore_slot(StorageKeys::ACCESS_TOKEN, previous_access, &previous_refresh);
            return Err(e);
        }

        debug!("Credential cleared");
        Ok(())
    }

    /// Stored biometric opt-in. Unset and unreadable both read as `None`.
    pub fn preference(&self) -> Option<bool> {
        match self.preferences.get_bool(StorageKeys::PREFERS_BIOMETRIC) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Preference read failed, treating as unset");
                None
            }
        }
    }

    pub fn set_preference(&self, prefers_biometric: bool) -> StorageResult<()> {
        self.preferences
            .set_bool(StorageKeys::PREFERS_BIOMETRIC, prefers_biometric)
    }

    pub fn clear_preference(&self) -> StorageResult<()> {
        self.preferences.remove(StorageKeys::PREFERS_BIOMETRIC)
    }

    /// Put `slot` back to its staged value. `other` is the staged value of the
    /// partner slot, which the failed operation never changed.
    ///
    /// If the slot cannot be restored, it is deleted instead so the store ends
    /// up with no pair at all rather than a mixed one.
    fn restore_slot(&self, slot: &str, staged: Staged, other: &Staged) {
        let restored = match &staged {
            Some(value) => self.secrets.set(slot, value),
            None => self.secrets.delete(slot).map(|_| ()),
        };

        if let Err(e) = restored {
            error!(key = %slot, error = %e, "Rollback failed, dropping both secrets");
            let _ = self.secrets.delete(slot);
            if other.is_some() {
                let partner = if slot == StorageKeys::ACCESS_TOKEN {
                    StorageKeys::REFRESH_TOKEN
                } else {
                    StorageKeys::ACCESS_TOKEN
                };
                let _ = self.secrets.delete(partner);
            }
        }
    }
}
