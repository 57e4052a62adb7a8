// 🗄️ Storage Port - key/value persistence behind a trait
// The account store only ever talks to this interface

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Key holding the serialized user registry
pub const USERS_KEY: &str = "users";

/// Key holding the serialized session account
pub const CURRENT_USER_KEY: &str = "currentUser";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String-keyed blob storage.
///
/// Values are opaque to the backend; callers own the encoding.
pub trait KeyValueStore {
    /// Read a value; `Ok(None)` when the key was never written or was removed
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
