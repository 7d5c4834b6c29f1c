//! Credential orchestration: login, register, logout.
//!
//! Everything here is transport-agnostic apart from the error mapping at the
//! bottom; routes translate [`IssuedSession`] into a body plus cookie.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as TokenTtl, Utc};
use thiserror::Error;

use gatehouse_auth::{
    Claims, Credential, DirectoryError, Registration, Role, TokenCodec, TokenError, UserDirectory,
    UserRecord,
};
use gatehouse_core::DomainError;

use crate::app::errors::ApiError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email is already exist")]
    DuplicateEmail,

    #[error("password is already exist")]
    DuplicatePassword,

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    MissingSession(&'static str),

    #[error("directory {op} failed: {source}")]
    Directory {
        op: &'static str,
        source: DirectoryError,
    },

    #[error("directory {0} timed out")]
    Timeout(&'static str),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(e) => ApiError::from(e),
            ServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            ServiceError::MissingSession(msg) => ApiError::unauthorized(msg),
            ServiceError::DuplicateEmail | ServiceError::DuplicatePassword => {
                ApiError::Conflict(err.to_string())
            }
            ServiceError::Rejected(msg) => ApiError::BadRequest(msg),
            ServiceError::Directory { .. } | ServiceError::Timeout(_) | ServiceError::Token(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

/// Directory access with a per-call deadline.
#[derive(Clone)]
pub struct DirectoryClient {
    inner: Arc<dyn UserDirectory>,
    timeout: Duration,
}

impl DirectoryClient {
    pub fn new(inner: Arc<dyn UserDirectory>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, DirectoryError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|source| ServiceError::Directory { op, source }),
            Err(_) => {
                tracing::error!(op, timeout_ms = self.timeout.as_millis() as u64, "directory call timed out");
                Err(ServiceError::Timeout(op))
            }
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        self.call("authenticate", self.inner.authenticate(email, password)).await
    }

    pub async fn fetch_role(&self, email: &str) -> Result<Role, ServiceError> {
        self.call("fetch_role", self.inner.fetch_role(email)).await
    }

    pub async fn is_duplicate_email(&self, email: &str) -> Result<bool, ServiceError> {
        self.call("is_duplicate_email", self.inner.is_duplicate_email(email)).await
    }

    pub async fn is_duplicate_password(&self, password: &str) -> Result<bool, ServiceError> {
        self.call("is_duplicate_password", self.inner.is_duplicate_password(password)).await
    }

    pub async fn insert_user(&self, registration: &Registration) -> Result<String, ServiceError> {
        self.call("insert_user", self.inner.insert_user(registration)).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ServiceError> {
        self.call("list_users", self.inner.list_users()).await
    }
}

/// A freshly signed session, ready to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub email: String,
    pub token: String,
    pub claims: Claims,
}

impl IssuedSession {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

/// Login/register/logout on top of the directory and the token codec.
pub struct CredentialService {
    directory: DirectoryClient,
    codec: TokenCodec,
    token_ttl: TokenTtl,
    reject_shared_passwords: bool,
}

impl CredentialService {
    pub fn new(
        directory: DirectoryClient,
        codec: TokenCodec,
        token_ttl: TokenTtl,
        reject_shared_passwords: bool,
    ) -> Self {
        Self {
            directory,
            codec,
            token_ttl,
            reject_shared_passwords,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, ServiceError> {
        let credential = Credential::parse(email, password)?;

        let email = match self
            .directory
            .authenticate(credential.email.as_str(), &credential.password)
            .await
        {
            Ok(email) => email,
            Err(ServiceError::Directory {
                source: DirectoryError::InvalidCredentials | DirectoryError::NotFound,
                ..
            }) => {
                tracing::warn!(email = %credential.email, "login rejected");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let role = self.directory.fetch_role(&email).await?;
        let session = self.issue(email, role, Utc::now())?;

        tracing::info!(email = %session.email, role = %role, "login succeeded");
        Ok(session)
    }

    /// Register a user and issue their first session.
    ///
    /// The token is signed before the user is persisted, so a signing failure
    /// can never leave a stored user without a returned credential.
    pub async fn register(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<IssuedSession, ServiceError> {
        let registration = Registration::parse(fullname, email, password, role)?;

        if self.directory.is_duplicate_email(registration.email.as_str()).await? {
            tracing::warn!(email = %registration.email, "register rejected: duplicate email");
            return Err(ServiceError::DuplicateEmail);
        }

        if self.reject_shared_passwords
            && self.directory.is_duplicate_password(&registration.password).await?
        {
            tracing::warn!(email = %registration.email, "register rejected: duplicate password");
            return Err(ServiceError::DuplicatePassword);
        }

        let session = self.issue(
            registration.email.as_str().to_string(),
            registration.role,
            Utc::now(),
        )?;

        let stored = match self.directory.insert_user(&registration).await {
            Ok(stored) => stored,
            Err(ServiceError::Directory {
                source: DirectoryError::Rejected(msg),
                ..
            }) => {
                tracing::warn!(email = %registration.email, reason = %msg, "register rejected by directory");
                return Err(ServiceError::Rejected(msg));
            }
            Err(e) => return Err(e),
        };

        if stored != session.email {
            tracing::warn!(submitted = %session.email, stored = %stored, "directory normalized email differently");
        }

        tracing::info!(email = %session.email, role = %registration.role, "register succeeded");
        Ok(session)
    }

    /// Validate that the caller holds a session cookie.
    ///
    /// There is no server-side session table: the token stays valid until
    /// its `exp` even after this returns, only the client copy is dropped.
    pub fn logout(&self, cookie: Option<&str>) -> Result<(), ServiceError> {
        match cookie {
            None => Err(ServiceError::MissingSession("missing session cookie")),
            Some("") => Err(ServiceError::MissingSession("empty session cookie")),
            Some(_) => {
                tracing::info!("logout");
                Ok(())
            }
        }
    }

    fn issue(&self, email: String, role: Role, now: DateTime<Utc>) -> Result<IssuedSession, ServiceError> {
        let claims = Claims::issue(email.clone(), role, now, self.token_ttl);
        let token = self.codec.encode(&claims).map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            e
        })?;
        Ok(IssuedSession { email, token, claims })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gatehouse_auth::SigningSecret;
    use gatehouse_infra::InMemoryUserDirectory;

    use super::*;

    const SECRET: &str = "service-test-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(&SigningSecret::new(SECRET))
    }

    fn service_over(directory: Arc<dyn UserDirectory>, reject_shared_passwords: bool) -> CredentialService {
        CredentialService::new(
            DirectoryClient::new(directory, Duration::from_millis(200)),
            codec(),
            TokenTtl::minutes(60),
            reject_shared_passwords,
        )
    }

    fn service() -> (CredentialService, Arc<InMemoryUserDirectory>) {
        let dir = Arc::new(InMemoryUserDirectory::new());
        (service_over(dir.clone(), true), dir)
    }

    #[tokio::test]
    async fn register_then_login_issues_matching_claims() {
        let (svc, _dir) = service();

        let registered = svc.register("A", "a@b.com", "p1", "admin").await.unwrap();
        assert_eq!(registered.email, "a@b.com");

        let session = svc.login("a@b.com", "p1").await.unwrap();
        let claims = codec().verify(&session.token, Utc::now()).unwrap();
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, Role::Admin);

        let ttl = claims.exp - Utc::now().timestamp();
        assert!((3595..=3600).contains(&ttl), "ttl was {ttl}");
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let (svc, _dir) = service();
        svc.register("A", "a@b.com", "p1", "user").await.unwrap();

        let wrong_password = svc.login("a@b.com", "nope").await.unwrap_err();
        let unknown_email = svc.login("x@b.com", "p1").await.unwrap_err();
        assert_eq!(wrong_password, ServiceError::InvalidCredentials);
        assert_eq!(unknown_email, ServiceError::InvalidCredentials);
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_validates_shape_first() {
        let (svc, _dir) = service();
        assert!(matches!(
            svc.login("not-an-email", "p1").await,
            Err(ServiceError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_insert() {
        let (svc, dir) = service();
        svc.register("A", "a@b.com", "p1", "user").await.unwrap();

        let err = svc.register("B", "a@b.com", "p2", "user").await.unwrap_err();
        assert_eq!(err, ServiceError::DuplicateEmail);
        assert_eq!(err.to_string(), "email is already exist");
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_password_check_is_configurable() {
        let (svc, _dir) = service();
        svc.register("A", "a@b.com", "shared", "user").await.unwrap();
        assert_eq!(
            svc.register("B", "b@b.com", "shared", "user").await.unwrap_err(),
            ServiceError::DuplicatePassword
        );

        let dir = Arc::new(InMemoryUserDirectory::new());
        let lenient = service_over(dir.clone(), false);
        lenient.register("A", "a@b.com", "shared", "user").await.unwrap();
        lenient.register("B", "b@b.com", "shared", "user").await.unwrap();
        assert_eq!(dir.len(), 2);
    }

    #[tokio::test]
    async fn logout_requires_non_empty_cookie() {
        let (svc, _dir) = service();
        assert!(matches!(svc.logout(None), Err(ServiceError::MissingSession(_))));
        assert!(matches!(svc.logout(Some("")), Err(ServiceError::MissingSession(_))));
        assert_eq!(svc.logout(Some("anything")), Ok(()));
    }

    /// Directory whose writes always fail, and whose reads are slow on demand.
    struct FlakyDirectory {
        stall: bool,
    }

    #[async_trait]
    impl UserDirectory for FlakyDirectory {
        async fn authenticate(&self, email: &str, _password: &str) -> Result<String, DirectoryError> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(email.to_string())
        }

        async fn fetch_role(&self, _email: &str) -> Result<Role, DirectoryError> {
            Ok(Role::User)
        }

        async fn is_duplicate_email(&self, _email: &str) -> Result<bool, DirectoryError> {
            Ok(false)
        }

        async fn is_duplicate_password(&self, _password: &str) -> Result<bool, DirectoryError> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(false)
        }

        async fn insert_user(&self, _registration: &Registration) -> Result<String, DirectoryError> {
            Err(DirectoryError::Rejected("fullname too long".into()))
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_insert_returns_no_session() {
        let svc = service_over(Arc::new(FlakyDirectory { stall: false }), true);
        assert_eq!(
            svc.register("A", "a@b.com", "p1", "user").await,
            Err(ServiceError::Rejected("fullname too long".into()))
        );
    }

    #[tokio::test]
    async fn slow_directory_times_out() {
        let svc = service_over(Arc::new(FlakyDirectory { stall: true }), true);
        assert_eq!(
            svc.login("a@b.com", "p1").await,
            Err(ServiceError::Timeout("authenticate"))
        );
    }

    #[tokio::test]
    async fn slow_shared_password_check_times_out() {
        let svc = service_over(Arc::new(FlakyDirectory { stall: true }), true);
        assert_eq!(
            svc.register("A", "a@b.com", "p1", "user").await,
            Err(ServiceError::Timeout("is_duplicate_password"))
        );
    }

    #[tokio::test]
    async fn directory_outage_is_internal() {
        let client = DirectoryClient::new(Arc::new(FlakyDirectory { stall: false }), Duration::from_millis(50));
        let err = client.list_users().await.unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }
}
