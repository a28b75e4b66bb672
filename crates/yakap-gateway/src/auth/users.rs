//! User accounts and credential verification.

use std::path::Path;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use yakap_core::types::fresh_id;

use super::AuthError;

/// User role for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access, including account creation.
    Admin,
    /// Can encode and update assistance records.
    Encoder,
}

impl Role {
    /// Check if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Encoder => write!(f, "ENCODER"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "ENCODER" => Ok(Self::Encoder),
            _ => Err(AuthError::Config(format!("Unknown role: {s}"))),
        }
    }
}

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    /// Argon2 password hash (stored only, never exposed in responses).
    pub password_hash: String,
    /// User role.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user last logged in.
    pub last_login: Option<DateTime<Utc>>,
    /// Whether the account is active.
    pub active: bool,
}

impl User {
    /// Create a new user with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn new(
        username: impl Into<String>,
        password: &str,
        name: Option<String>,
        role: Role,
    ) -> Result<Self, AuthError> {
        let username = username.into();
        let id = fresh_id("user");
        let password_hash = hash_password(password)?;

        Ok(Self {
            id,
            username,
            name,
            password_hash,
            role,
            created_at: Utc::now(),
            last_login: None,
            active: true,
        })
    }

    /// Verify a password against this user's hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch.
    pub fn verify_password(&self, password: &str) -> Result<(), AuthError> {
        verify_password(password, &self.password_hash)
    }

    /// Update the user's password.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<(), AuthError> {
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    /// Create a safe version of the user for API responses (no hash).
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public user representation (for API responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    /// Unique user ID.
    pub user_id: String,
    /// Username.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    /// User role.
    pub role: Role,
    /// When created.
    pub created_at: DateTime<Utc>,
}

/// User store backed by sled.
pub struct UserStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl UserStore {
    /// Open or create a user store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, AuthError> {
        let db = sled::open(path.join("auth"))
            .map_err(|e| AuthError::Storage(format!("Failed to open auth database: {e}")))?;
        Self::with_db(db)
    }

    /// Create a user store over an existing sled database.
    ///
    /// # Errors
    ///
    /// Returns error if tree cannot be opened.
    pub fn with_db(db: sled::Db) -> Result<Self, AuthError> {
        let tree = db
            .open_tree("users")
            .map_err(|e| AuthError::Storage(format!("Failed to open users tree: {e}")))?;

        Ok(Self { db, tree })
    }

    /// Get the underlying sled database.
    #[must_use]
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Check if any users exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Count total users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree
            .iter()
            .filter(|r| {
                r.as_ref()
                    .map(|(k, _)| !k.starts_with(b"idx:"))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UsernameTaken` if the username is already
    /// registered, or a storage error.
    pub fn create(&self, user: &User) -> Result<(), AuthError> {
        if self.get_by_username(&user.username)?.is_some() {
            return Err(AuthError::UsernameTaken(user.username.clone()));
        }

        let value = serde_json::to_vec(user)
            .map_err(|e| AuthError::Storage(format!("Serialization error: {e}")))?;

        self.tree
            .insert(user.id.as_bytes(), value)
            .map_err(|e| AuthError::Storage(format!("Insert error: {e}")))?;

        // username -> id index
        let index_key = format!("idx:username:{}", user.username);
        self.tree
            .insert(index_key.as_bytes(), user.id.as_bytes())
            .map_err(|e| AuthError::Storage(format!("Index error: {e}")))?;

        self.tree
            .flush()
            .map_err(|e| AuthError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get(&self, id: &str) -> Result<Option<User>, AuthError> {
        match self.tree.get(id.as_bytes()) {
            Ok(Some(value)) => {
                let user: User = serde_json::from_slice(&value)
                    .map_err(|e| AuthError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Get error: {e}"))),
        }
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let index_key = format!("idx:username:{username}");
        match self.tree.get(index_key.as_bytes()) {
            Ok(Some(id_bytes)) => {
                let id = String::from_utf8_lossy(&id_bytes);
                self.get(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Index lookup error: {e}"))),
        }
    }

    /// Update an existing user.
    ///
    /// # Errors
    ///
    /// Returns error if user doesn't exist or storage fails.
    pub fn update(&self, user: &User) -> Result<(), AuthError> {
        if self.get(&user.id)?.is_none() {
            return Err(AuthError::UserNotFound(user.id.clone()));
        }

        let value = serde_json::to_vec(user)
            .map_err(|e| AuthError::Storage(format!("Serialization error: {e}")))?;

        self.tree
            .insert(user.id.as_bytes(), value)
            .map_err(|e| AuthError::Storage(format!("Update error: {e}")))?;

        self.tree
            .flush()
            .map_err(|e| AuthError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn delete(&self, id: &str) -> Result<bool, AuthError> {
        if let Some(user) = self.get(id)? {
            let index_key = format!("idx:username:{}", user.username);
            self.tree
                .remove(index_key.as_bytes())
                .map_err(|e| AuthError::Storage(format!("Index remove error: {e}")))?;
        }

        let removed = self
            .tree
            .remove(id.as_bytes())
            .map_err(|e| AuthError::Storage(format!("Delete error: {e}")))?
            .is_some();

        self.tree
            .flush()
            .map_err(|e| AuthError::Storage(format!("Flush error: {e}")))?;

        Ok(removed)
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list(&self) -> Result<Vec<User>, AuthError> {
        let mut users = Vec::new();

        for result in self.tree.iter() {
            let (key, value) = result.map_err(|e| AuthError::Storage(format!("Iter error: {e}")))?;

            // Skip index entries
            if key.starts_with(b"idx:") {
                continue;
            }

            let user: User = serde_json::from_slice(&value)
                .map_err(|e| AuthError::Storage(format!("Deserialization error: {e}")))?;
            users.push(user);
        }

        Ok(users)
    }

    /// Update last login time for a user.
    ///
    /// # Errors
    ///
    /// Returns error if user doesn't exist or storage fails.
    pub fn update_last_login(&self, id: &str) -> Result<(), AuthError> {
        let mut user = self
            .get(id)?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        user.last_login = Some(Utc::now());
        self.update(&user)
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("user_count", &self.count())
            .finish_non_exhaustive()
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Config(format!("Password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::Config(format!("Invalid hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_user_creation() {
        let user = User::new("maria", "password123", Some("Maria Clara".into()), Role::Encoder)
            .unwrap();
        assert_eq!(user.username, "maria");
        assert!(user.id.starts_with("user_"));
        assert!(user.active);
        assert_eq!(user.role, Role::Encoder);
    }

    #[test]
    fn test_password_verification() {
        let user = User::new("maria", "password123", None, Role::Encoder).unwrap();
        assert!(user.verify_password("password123").is_ok());
        assert!(matches!(
            user.verify_password("wrongpassword"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_public_user_has_no_hash() {
        let user = User::new("maria", "password123", None, Role::Admin).unwrap();
        let public = user.to_public();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"ADMIN\""));
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Encoder).unwrap(), "\"ENCODER\"");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        assert!(store.is_empty());

        let user = User::new("admin", "secret", None, Role::Admin).unwrap();
        store.create(&user).unwrap();

        assert!(!store.is_empty());
        assert_eq!(store.count(), 1);

        let loaded = store.get(&user.id).unwrap().unwrap();
        assert_eq!(loaded.username, "admin");

        let by_name = store.get_by_username("admin").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[test]
    fn test_username_is_case_sensitive() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        let user = User::new("Maria", "secret", None, Role::Encoder).unwrap();
        store.create(&user).unwrap();

        assert!(store.get_by_username("maria").unwrap().is_none());
        assert!(store.get_by_username("Maria").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_user() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        let user1 = User::new("admin", "secret1", None, Role::Admin).unwrap();
        store.create(&user1).unwrap();

        let user2 = User::new("admin", "secret2", None, Role::Encoder).unwrap();
        let result = store.create(&user2);

        assert!(matches!(result, Err(AuthError::UsernameTaken(_))));
    }

    #[test]
    fn test_last_login_stamp() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        let user = User::new("admin", "secret", None, Role::Admin).unwrap();
        store.create(&user).unwrap();
        assert!(store.get(&user.id).unwrap().unwrap().last_login.is_none());

        store.update_last_login(&user.id).unwrap();
        assert!(store.get(&user.id).unwrap().unwrap().last_login.is_some());
    }
}
