//! Login, registration and sign-out.

use crate::context::AppContext;
use crate::state::{Observable, ScreenStatus};
use chrono::Utc;
use rt_core::error::{AppError, Result};
use rt_core::models::{Collection, Session, User};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Everything the registration screen collects.
#[derive(Debug)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub profile_image: Option<PathBuf>,
}

impl RegistrationForm {
    /// Local checks only. Returns the profile image to upload.
    fn validate(&self) -> Result<&Path> {
        let blank = self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.expose_secret().is_empty()
            || self.confirm_password.expose_secret().is_empty();
        let image = match (&self.profile_image, blank) {
            (Some(image), false) => image.as_path(),
            _ => return Err(AppError::Validation("please fill all the fields".into())),
        };
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(AppError::Validation("passwords do not match".into()));
        }
        Ok(image)
    }
}

pub struct AuthViewModel {
    ctx: AppContext,
    pub status: Observable<ScreenStatus>,
    pub register_success: Observable<bool>,
    pub login_success: Observable<bool>,
}

impl AuthViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            status: Observable::default(),
            register_success: Observable::new(false),
            login_success: Observable::new(false),
        }
    }

    /// The signed-in session as it changes.
    pub fn current_user(&self) -> watch::Receiver<Option<Session>> {
        self.ctx.session.subscribe()
    }

    /// Signs in, then reads the user's profile into the local cache. The
    /// login only counts as complete once that read has finished.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session> {
        let result = self.try_login(email, password).await;
        self.login_success.set(result.is_ok());
        self.status.settle(result)
    }

    async fn try_login(&self, email: &str, password: &SecretString) -> Result<Session> {
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(AppError::Validation("please fill all fields".into()));
        }
        self.status.begin();

        let session = self.ctx.auth.sign_in(email.trim(), password).await?;
        match self.complete_login(&session).await {
            Ok(()) => {
                tracing::info!(user_id = %session.user_id, "login complete");
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "login incomplete, signing out");
                if let Err(e) = self.ctx.auth.sign_out().await {
                    tracing::warn!(error = %e, "sign-out after failed login failed");
                }
                Err(e)
            }
        }
    }

    async fn complete_login(&self, session: &Session) -> Result<()> {
        let profile = self
            .ctx
            .store
            .get_doc::<User>(Collection::Users, &session.user_id)
            .await?
            .map(|user| user.with_id(session.user_id.clone()));
        if profile.is_none() {
            tracing::warn!(user_id = %session.user_id, "signed in without a profile document");
        }
        self.ctx.session.begin(session.clone(), profile.as_ref()).await
    }

    /// Creates the identity, uploads the avatar, writes the profile and
    /// starts the session. If anything after identity creation fails, the
    /// identity is deleted again before the error is reported.
    #[tracing::instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<User> {
        let result = self.try_register(form).await;
        if result.is_ok() {
            self.register_success.set(true);
        }
        self.status.settle(result)
    }

    async fn try_register(&self, form: &RegistrationForm) -> Result<User> {
        let image = form.validate()?;
        self.status.begin();

        let session = self.ctx.auth.sign_up(form.email.trim(), &form.password).await?;
        match self.complete_registration(&session, form, image).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.roll_back(&session, &e).await;
                Err(e)
            }
        }
    }

    async fn complete_registration(&self, session: &Session, form: &RegistrationForm, image: &Path) -> Result<User> {
        let public_id = format!("users/{}/{}", session.user_id, Utc::now().timestamp_millis());
        let profile_image_url = self.ctx.media.upload(image, &public_id).await?;

        let user = User {
            id: session.user_id.clone(),
            username: form.username.trim().to_string(),
            email: session.email.clone(),
            profile_image_url,
        };
        self.ctx.store.set_doc(Collection::Users, &user.id, &user).await?;
        self.ctx.session.begin(session.clone(), Some(&user)).await?;

        tracing::info!(user_id = %user.id, "registration complete");
        Ok(user)
    }

    async fn roll_back(&self, session: &Session, cause: &AppError) {
        tracing::warn!(user_id = %session.user_id, error = %cause, "registration failed, deleting identity");
        if let Err(e) = self.ctx.auth.delete_identity(&session.user_id).await {
            tracing::warn!(user_id = %session.user_id, error = %e, "identity rollback failed");
        }
        if self.ctx.session.current().is_some_and(|s| s.user_id == session.user_id) {
            if let Err(e) = self.ctx.session.end().await {
                tracing::warn!(error = %e, "could not clear session after rollback");
            }
        }
    }

    pub async fn log_out(&self) -> Result<()> {
        let result = async {
            self.ctx.auth.sign_out().await?;
            self.ctx.session.end().await
        }
        .await;
        self.status.settle(result)
    }

    pub fn reset_register_success(&self) {
        self.register_success.set(false);
    }

    pub fn reset_login_success(&self) {
        self.login_success.set(false);
    }
}
