use crate::utils::StorageError;

/// Persistent key/value storage shared by the cache and the booking store
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reject a write that would push the store over its quota
pub(super) fn check_quota(
    quota: Option<usize>,
    used_by_others: usize,
    value_len: usize,
) -> Result<(), StorageError> {
    if let Some(quota) = quota {
        let needed = used_by_others + value_len;
        if needed > quota {
            return Err(StorageError::QuotaExceeded { needed, quota });
        }
    }
    Ok(())
}
