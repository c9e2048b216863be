//! Authentication service, application-layer orchestration
//!
//! Register, Login and Profile live here. HTTP handlers are thin wrappers
//! that delegate to this service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ports::{dispatch, Notification, Notifier};
use crate::domain::{
    display_name_from_email, DomainError, DomainResult, NewUser, User, UserDirectory, UserLookup,
};
use crate::infrastructure::crypto::{CredentialHasher, IssuedToken, JwtIssuer};

/// Returned after a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: User,
}

/// Orchestrates the identity use-cases.
///
/// Every collaborator is shared and read-only, so one instance serves all
/// requests concurrently.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<CredentialHasher>,
    issuer: Arc<JwtIssuer>,
    welcome: Option<Arc<dyn Notifier>>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<CredentialHasher>,
        issuer: Arc<JwtIssuer>,
    ) -> Self {
        Self {
            directory,
            hasher,
            issuer,
            welcome: None,
        }
    }

    /// Send a welcome message to every newly registered address.
    pub fn with_welcome_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.welcome = Some(notifier);
        self
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    pub fn issuer(&self) -> &JwtIssuer {
        &self.issuer
    }

    // ── Registration ────────────────────────────────────────────

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> DomainResult<User> {
        let result = self.register_inner(email, password, confirmation).await;
        metrics::counter!("auth_register_total", "outcome" => outcome_label(&result)).increment(1);
        result
    }

    async fn register_inner(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> DomainResult<User> {
        if password.is_empty() {
            return Err(DomainError::Validation("Password must not be empty".into()));
        }
        if password != confirmation {
            return Err(DomainError::Validation(
                "Password confirmation does not match".into(),
            ));
        }

        if self.directory.find_user(UserLookup::Email(email)).await?.is_some() {
            debug!(email, "Registration rejected, email taken");
            return Err(DomainError::EmailExists(email.to_string()));
        }

        let name = display_name_from_email(email)
            .ok_or_else(|| DomainError::MalformedEmail(email.to_string()))?
            .to_string();

        let password_hash = self.hasher.hash(password)?;

        let user = self
            .directory
            .create_user(NewUser {
                name,
                email: email.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "New user registered");

        if let Some(notifier) = &self.welcome {
            dispatch(notifier.clone(), welcome_message(&user));
        }

        Ok(user)
    }

    // ── Authentication ──────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> DomainResult<LoginOutcome> {
        let result = self.login_inner(email, password).await;
        metrics::counter!("auth_login_total", "outcome" => outcome_label(&result)).increment(1);
        result
    }

    async fn login_inner(&self, email: &str, password: &str) -> DomainResult<LoginOutcome> {
        let user = self
            .directory
            .find_user(UserLookup::Email(email))
            .await?
            .ok_or_else(|| DomainError::EmailNotFound(email.to_string()))?;

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login failed, wrong password");
            return Err(DomainError::WrongPassword);
        }

        let token = self.issuer.issue(user.id, &user.name)?;

        info!(user_id = user.id, "User logged in");
        Ok(LoginOutcome { token, user })
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Canonical record for an identity resolved by upstream middleware.
    pub async fn profile(&self, user_id: i64) -> DomainResult<User> {
        self.directory
            .find_user(UserLookup::Id(user_id))
            .await?
            .ok_or(DomainError::InvalidUser(user_id))
    }

    /// Verify a bearer token and load the user it is bound to.
    pub async fn resolve_token(&self, token: &str) -> DomainResult<User> {
        let identity = self.issuer.verify(token)?;
        self.profile(identity.user_id).await
    }
}

fn welcome_message(user: &User) -> Notification {
    Notification {
        to: user.email.clone(),
        subject: "Welcome".to_string(),
        body: format!(
            "<p>Hi {}, your account has been created. You can now sign in with {}.</p>",
            user.name, user.email
        ),
    }
}

fn outcome_label<T>(result: &DomainResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(DomainError::Validation(_)) => "invalid",
        Err(DomainError::EmailExists(_)) => "email_exists",
        Err(DomainError::EmailNotFound(_)) => "email_not_found",
        Err(DomainError::WrongPassword) => "wrong_password",
        Err(_) => "error",
    }
}
