// 👤 Account Store - local user registry, session pointer, saved scholarships
//
// The registry lives under `users`, the session under `currentUser`.
// The session holds a full copy of the logged-in account; every mutation of
// the saved set is written to both copies so a later login sees it.
//
// Passwords are stored and compared verbatim. This is a local convenience
// account, not an authentication system.

use crate::catalog::ScholarshipId;
use crate::storage::{KeyValueStore, StorageError, CURRENT_USER_KEY, USERS_KEY};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LEN: usize = 4;

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Creation time in epoch milliseconds, strictly increasing per registry
    pub id: i64,
    pub username: String,
    /// Trimmed and lower-cased
    pub email: String,
    pub password: String,
    #[serde(rename = "savedScholarships", alias = "savedScholarshipIds", default)]
    pub saved_scholarships: BTreeSet<ScholarshipId>,
}

impl UserAccount {
    pub fn has_saved(&self, id: &ScholarshipId) -> bool {
        self.saved_scholarships.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(UserAccount),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserAccount> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields.")]
    MissingField,

    #[error("Password must be at least 4 characters.")]
    PasswordTooShort,

    #[error("An account with this email already exists.")]
    DuplicateEmail,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please fill in all fields.")]
    MissingField,

    /// Unknown email and wrong password share this variant
    #[error("Invalid email or password. Please try again.")]
    InvalidCredentials,

    #[error("Please log in to save scholarships.")]
    NotLoggedIn,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug)]
pub struct AccountStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(storage: S) -> Self {
        AccountStore { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Registry contents. Unreadable or corrupt data reads as empty.
    pub fn users(&self) -> Vec<UserAccount> {
        self.read_users().unwrap_or_else(|e| {
            warn!(error = %e, "user registry unavailable");
            Vec::new()
        })
    }

    /// Create an account. Does not log in.
    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, ValidationError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if username.is_empty() || email.is_empty() || password.trim().is_empty() {
            return Err(ValidationError::MissingField);
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }

        let mut users = self.read_users()?;

        if users.iter().any(|u| u.email.to_lowercase() == email) {
            return Err(ValidationError::DuplicateEmail);
        }

        let account = UserAccount {
            id: next_account_id(&users),
            username: username.to_string(),
            email,
            password: password.to_string(),
            saved_scholarships: BTreeSet::new(),
        };

        users.push(account.clone());
        self.write_users(&users)?;

        info!(user_id = account.id, email = %account.email, "account registered");
        Ok(account)
    }

    /// Authenticate and start a session
    pub fn login(&mut self, email: &str, password: &str) -> Result<UserAccount, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingField);
        }

        let email = email.to_lowercase();
        let user = self
            .read_users()?
            .into_iter()
            .find(|u| u.email.to_lowercase() == email && u.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        self.write_session(&user)?;

        info!(user_id = user.id, "logged in");
        Ok(user)
    }

    /// End the session. Calling it while anonymous is a no-op.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.storage.remove(CURRENT_USER_KEY)?;
        info!("logged out");
        Ok(())
    }

    /// The session account, if any. Corrupt session data reads as anonymous.
    pub fn current_user(&self) -> Option<UserAccount> {
        let raw = match self.storage.get(CURRENT_USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session unavailable");
                return None;
            }
        };

        match serde_json::from_str::<Option<UserAccount>>(&raw) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "discarding corrupt session");
                None
            }
        }
    }

    pub fn session(&self) -> Session {
        match self.current_user() {
            Some(user) => Session::Authenticated(user),
            None => Session::Anonymous,
        }
    }

    pub fn is_saved(&self, id: &ScholarshipId) -> bool {
        self.current_user()
            .map(|user| user.has_saved(id))
            .unwrap_or(false)
    }

    /// Saved ids of the current user, empty when anonymous
    pub fn saved_ids(&self) -> BTreeSet<ScholarshipId> {
        self.current_user()
            .map(|user| user.saved_scholarships)
            .unwrap_or_default()
    }

    /// Flip membership of `id` in the current user's saved set.
    ///
    /// Returns whether the id is saved afterwards. Writes the registry entry
    /// with the same account id, then the session copy. A failed registry
    /// write leaves both copies unchanged.
    pub fn toggle_saved(&mut self, id: &ScholarshipId) -> Result<bool, AuthError> {
        let mut user = self.current_user().ok_or(AuthError::NotLoggedIn)?;

        let saved = if user.saved_scholarships.remove(id) {
            false
        } else {
            user.saved_scholarships.insert(id.clone());
            true
        };

        let mut users = self.read_users()?;
        if let Some(entry) = users.iter_mut().find(|u| u.id == user.id) {
            entry.saved_scholarships = user.saved_scholarships.clone();
            self.write_users(&users)?;
        } else {
            warn!(user_id = user.id, "session account missing from registry");
        }

        self.write_session(&user)?;

        debug!(user_id = user.id, scholarship = %id, saved, "toggled saved scholarship");
        Ok(saved)
    }

    // ========================================================================
    // PERSISTENCE HELPERS
    // ========================================================================

    /// Backend errors propagate; undecodable content reads as an empty registry
    fn read_users(&self) -> Result<Vec<UserAccount>, StorageError> {
        let Some(raw) = self.storage.get(USERS_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Option<Vec<UserAccount>>>(&raw) {
            Ok(users) => Ok(users.unwrap_or_default()),
            Err(e) => {
                warn!(error = %e, "discarding corrupt user registry");
                Ok(Vec::new())
            }
        }
    }

    fn write_users(&mut self, users: &[UserAccount]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(users)?;
        self.storage.set(USERS_KEY, &encoded)
    }

    fn write_session(&mut self, user: &UserAccount) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(user)?;
        self.storage.set(CURRENT_USER_KEY, &encoded)
    }
}

fn next_account_id(users: &[UserAccount]) -> i64 {
    let now = Utc::now().timestamp_millis();
    users
        .iter()
        .map(|u| u.id)
        .max()
        .map_or(now, |max| now.max(max + 1))
}

// ============================================================================
// TESTS
// ============================================================================
