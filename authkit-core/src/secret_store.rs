//! Generic secret-by-name storage with upsert and idempotent delete.

use std::sync::Arc;

use crate::platform::{PlatformStatus, SecretItemBackend};
use crate::AuthKitError;

/// Secret store layered over the raw OS item primitive.
///
/// `set` is an upsert, `get` reports absence as `None`, and `delete` of an
/// absent item is success. Any other negative status surfaces as
/// [`AuthKitError::OsFailure`].
pub struct SecureItemStore {
    backend: Arc<dyn SecretItemBackend>,
}

impl SecureItemStore {
    /// Creates a store over the given backend.
    #[must_use]
    pub const fn new(backend: Arc<dyn SecretItemBackend>) -> Self {
        Self { backend }
    }

    /// Upserts `value` under `name`: update first, insert when absent.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`] on any storage status other than
    /// not-found on the update attempt.
    pub fn set(&self, name: &str, value: &str) -> Result<(), AuthKitError> {
        match self.backend.update(name.to_string(), value.to_string()) {
            Ok(()) => Ok(()),
            Err(PlatformStatus::NotFound) => self
                .backend
                .insert(name.to_string(), value.to_string())
                .map_err(PlatformStatus::into_os_failure),
            Err(status) => Err(status.into_os_failure()),
        }
    }

    /// Reads the value under `name`; `None` exactly when absent.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`] on any other negative status.
    pub fn get(&self, name: &str) -> Result<Option<String>, AuthKitError> {
        match self.backend.fetch(name.to_string()) {
            Ok(value) => Ok(Some(value)),
            Err(PlatformStatus::NotFound) => Ok(None),
            Err(status) => Err(status.into_os_failure()),
        }
    }

    /// Removes the item under `name`; absence is success.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`] on a genuine storage fault.
    pub fn delete(&self, name: &str) -> Result<(), AuthKitError> {
        match self.backend.remove(name.to_string()) {
            Ok(()) | Err(PlatformStatus::NotFound) => Ok(()),
            Err(status) => Err(status.into_os_failure()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemorySecretStore;

    fn store() -> SecureItemStore {
        SecureItemStore::new(Arc::new(MemorySecretStore::new()))
    }

    #[test]
    fn test_set_get_roundtrip() {
        let store = store();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        // Upsert replaces the existing value.
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".to_string()));
    }

    #[test]
    fn test_get_absent_is_none() {
        assert_eq!(store().get("missing").unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store();
        store.set("k", "v").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.delete("k").unwrap();
    }
}
