//! # rt-auth-simple
//!
//! In-process, Argon2-based implementation of `AuthProvider`.
//! Only Argon2id hashes (peppered with a server secret) are kept; the
//! plaintext password never outlives the call that carried it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rt_core::error::{AppError, Result};
use rt_core::models::Session;
use rt_core::traits::AuthProvider;
use secrecy::{ExposeSecret, SecretString};
use std::sync::RwLock;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user_id: String,
    password_hash: String,
}

pub struct SimpleAuthProvider {
    /// Server-side secret mixed into every hash.
    pepper: SecretString,
    /// Accounts keyed by normalized email.
    accounts: DashMap<String, Account>,
    current: RwLock<Option<Session>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SimpleAuthProvider {
    pub fn new(pepper: SecretString) -> Self {
        Self {
            pepper,
            accounts: DashMap::new(),
            current: RwLock::new(None),
        }
    }

    fn hasher(&self) -> Result<Argon2<'_>> {
        Argon2::new_with_secret(
            self.pepper.expose_secret().as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| AppError::Internal(format!("argon2 setup: {e}")))
    }

    fn set_current(&self, session: Option<Session>) {
        // A poisoned lock only means a writer panicked; the Option is still valid.
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = session;
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    #[tracing::instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<Session> {
        let key = normalize_email(email);
        if !key.contains('@') {
            return Err(AppError::AuthFailed("the email address is badly formatted".into()));
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::AuthFailed(format!(
                "password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher()?
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("argon2 hash: {e}")))?
            .to_string();

        let user_id = Uuid::new_v4().simple().to_string();
        match self.accounts.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::AuthFailed(
                    "the email address is already in use by another account".into(),
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    user_id: user_id.clone(),
                    password_hash,
                });
            }
        }

        let session = Session { user_id, email: key };
        self.set_current(Some(session.clone()));
        tracing::info!(user_id = %session.user_id, "identity created");
        Ok(session)
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session> {
        let key = normalize_email(email);
        let (user_id, stored_hash) = match self.accounts.get(&key) {
            Some(account) => (account.user_id.clone(), account.password_hash.clone()),
            None => return Err(AppError::AuthFailed("invalid email or password".into())),
        };

        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AppError::Internal(format!("stored hash unreadable: {e}")))?;
        self.hasher()?
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .map_err(|_| AppError::AuthFailed("invalid email or password".into()))?;

        let session = Session { user_id, email: key };
        self.set_current(Some(session.clone()));
        tracing::info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    async fn delete_identity(&self, user_id: &str) -> Result<()> {
        let before = self.accounts.len();
        self.accounts.retain(|_, account| account.user_id != user_id);
        if self.accounts.len() == before {
            return Err(AppError::NotFound("identity".into(), user_id.to_string()));
        }
        if self.current_session().is_some_and(|s| s.user_id == user_id) {
            self.set_current(None);
        }
        tracing::info!(%user_id, "identity deleted");
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_current(None);
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SimpleAuthProvider {
        SimpleAuthProvider::new(SecretString::from("test-pepper-0123456789"))
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = provider();
        let created = auth.sign_up("Alice@Example.com", &secret("hunter22")).await.unwrap();
        assert_eq!(auth.current_session(), Some(created.clone()));

        auth.sign_out().await.unwrap();
        assert!(auth.current_session().is_none());

        let session = auth.sign_in("alice@example.com", &secret("hunter22")).await.unwrap();
        assert_eq!(session.user_id, created.user_id);
    }

    #[tokio::test]
    async fn wrong_password_is_refused() {
        let auth = provider();
        auth.sign_up("a@b.c", &secret("hunter22")).await.unwrap();
        auth.sign_out().await.unwrap();

        let err = auth.sign_in("a@b.c", &secret("hunter23")).await.unwrap_err();
        assert!(matches!(err, AppError::AuthFailed(_)));
        assert!(auth.current_session().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_and_weak_password_are_refused() {
        let auth = provider();
        auth.sign_up("a@b.c", &secret("hunter22")).await.unwrap();
        assert!(auth.sign_up("A@B.C", &secret("hunter22")).await.is_err());
        assert!(auth.sign_up("x@y.z", &secret("123")).await.is_err());
        assert!(auth.sign_up("not-an-email", &secret("hunter22")).await.is_err());
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_password() {
        let auth = provider();
        auth.sign_up("a@b.c", &secret("hunter22")).await.unwrap();
        let account = auth.accounts.get("a@b.c").unwrap();
        assert!(account.password_hash.starts_with("$argon2id$"));
        assert!(!account.password_hash.contains("hunter22"));
    }

    #[tokio::test]
    async fn deleting_identity_ends_its_session() {
        let auth = provider();
        let session = auth.sign_up("a@b.c", &secret("hunter22")).await.unwrap();

        auth.delete_identity(&session.user_id).await.unwrap();
        assert!(auth.current_session().is_none());
        assert!(auth.sign_in("a@b.c", &secret("hunter22")).await.is_err());
        assert!(auth.delete_identity(&session.user_id).await.is_err());
    }
}
