//! # Login Flow
//!
//! Credential login with lockout, and session resolution for authenticated
//! requests. The rate limiter is keyed by the email exactly as submitted;
//! the account lookup itself is lowercased like every other read.

use std::sync::Arc;

use tracing::{info, warn};

use domains::{
    AppError, Credentials, RateLimitDecision, RateLimitStore, Result, User, UserRepo,
};

use crate::validation;

pub struct AuthService {
    users: Arc<dyn UserRepo>,
    credentials: Arc<dyn Credentials>,
    limiter: Arc<dyn RateLimitStore>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        credentials: Arc<dyn Credentials>,
        limiter: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            users,
            credentials,
            limiter,
        }
    }

    /// Authenticates an email/password pair and issues a session token.
    ///
    /// Order matters: the limiter is consulted before any store access, an
    /// unknown account and a wrong password both count as failures, and a
    /// deactivated account is reported without counting one.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let mut errors = Vec::new();
        if email.is_empty() {
            errors.push("Email is required".to_string());
        } else if let Some(msg) = validation::error_message(validation::email(email)) {
            errors.push(msg);
        }
        if password.is_empty() {
            errors.push("Password is required".to_string());
        } else if password.chars().count() < validation::PASSWORD_MIN {
            errors.push(format!(
                "Password must be at least {} characters long",
                validation::PASSWORD_MIN
            ));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("; ")));
        }

        if let RateLimitDecision::Denied { retry_after_secs } = self.limiter.check(email).await? {
            warn!(retry_after_secs, "login locked out");
            return Err(AppError::RateLimited { retry_after_secs });
        }

        let user = match self.users.find_by_email(&email.to_lowercase()).await? {
            Some(user) => user,
            None => {
                self.limiter.record_failure(email).await?;
                return Err(AppError::Unauthorized("Invalid email or password".into()));
            }
        };

        if !user.is_active {
            return Err(AppError::Forbidden(
                "Account is deactivated. Please contact support.".into(),
            ));
        }

        if !self.credentials.verify_password(password, &user.password_hash)? {
            self.limiter.record_failure(email).await?;
            return Err(AppError::Unauthorized("Invalid email or password".into()));
        }

        self.limiter.reset(email).await?;
        let token = self.credentials.issue_token(&user)?;

        // Best effort: a failed timestamp write must not undo the login.
        if let Err(e) = self.users.set_last_login(user.id, chrono::Utc::now()).await {
            warn!(user_id = %user.id, error = %e, "last-login update failed");
        }

        info!(user_id = %user.id, "login succeeded");
        Ok((user, token))
    }

    /// Resolves a session token to its current account. The account is
    /// re-read on every call so deactivation takes effect immediately.
    pub async fn current_user(&self, token: &str) -> Result<User> {
        let claims = self.credentials.verify_token(token)?;
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::not_found("User", claims.sub))?;
        if !user.is_active {
            return Err(AppError::Forbidden(
                "Account is deactivated. Please contact support.".into(),
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::traits::{MockCredentials, MockRateLimitStore, MockUserRepo};
    use domains::{Role, SessionClaims};
    use uuid::Uuid;

    fn account(active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$stored".into(),
            user_role: Role::User,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }

    fn open_limiter() -> MockRateLimitStore {
        let mut limiter = MockRateLimitStore::new();
        limiter
            .expect_check()
            .returning(|_| Ok(RateLimitDecision::Allowed));
        limiter
    }

    #[tokio::test]
    async fn malformed_input_never_reaches_the_limiter() {
        let svc = AuthService::new(
            Arc::new(MockUserRepo::new()),
            Arc::new(MockCredentials::new()),
            Arc::new(MockRateLimitStore::new()),
        );
        let err = svc.login("not-an-email", "pw").await.unwrap_err();
        let AppError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("Invalid email format"));
        assert!(msg.contains("at least 6 characters"));
    }

    #[tokio::test]
    async fn lockout_denies_before_any_lookup() {
        let mut limiter = MockRateLimitStore::new();
        limiter
            .expect_check()
            .returning(|_| Ok(RateLimitDecision::Denied { retry_after_secs: 540 }));
        let svc = AuthService::new(
            Arc::new(MockUserRepo::new()),
            Arc::new(MockCredentials::new()),
            Arc::new(limiter),
        );
        let err = svc
            .login("alice@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited { retry_after_secs: 540 }));
    }

    #[tokio::test]
    async fn unknown_account_records_a_failure() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let mut limiter = open_limiter();
        limiter
            .expect_record_failure()
            .times(1)
            .withf(|key| key == "Ghost@Example.com")
            .returning(|_| Ok(()));
        let svc = AuthService::new(
            Arc::new(users),
            Arc::new(MockCredentials::new()),
            Arc::new(limiter),
        );
        let err = svc
            .login("Ghost@Example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn deactivated_account_is_forbidden_without_counting() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(account(false))));
        // open_limiter has no record_failure expectation: recording would panic.
        let svc = AuthService::new(
            Arc::new(users),
            Arc::new(MockCredentials::new()),
            Arc::new(open_limiter()),
        );
        let err = svc
            .login("alice@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn wrong_password_records_a_failure() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(account(true))));
        let mut credentials = MockCredentials::new();
        credentials.expect_verify_password().returning(|_, _| Ok(false));
        let mut limiter = open_limiter();
        limiter.expect_record_failure().times(1).returning(|_| Ok(()));
        let svc = AuthService::new(Arc::new(users), Arc::new(credentials), Arc::new(limiter));
        let err = svc
            .login("alice@example.com", "wrongpassword")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn successful_login_resets_the_limiter_and_issues_a_token() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "alice@example.com")
            .returning(|_| Ok(Some(account(true))));
        users.expect_set_last_login().returning(|_, _| Ok(()));
        let mut credentials = MockCredentials::new();
        credentials.expect_verify_password().returning(|_, _| Ok(true));
        credentials
            .expect_issue_token()
            .returning(|_| Ok("session-token".into()));
        let mut limiter = open_limiter();
        limiter
            .expect_reset()
            .times(1)
            .withf(|key| key == "Alice@Example.com")
            .returning(|_| Ok(()));
        let svc = AuthService::new(Arc::new(users), Arc::new(credentials), Arc::new(limiter));
        let (user, token) = svc
            .login("Alice@Example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(token, "session-token");
    }

    #[tokio::test]
    async fn failed_last_login_write_does_not_block_the_session() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(account(true))));
        users
            .expect_set_last_login()
            .returning(|_, _| Err(AppError::Database("write refused".into())));
        let mut credentials = MockCredentials::new();
        credentials.expect_verify_password().returning(|_, _| Ok(true));
        credentials
            .expect_issue_token()
            .returning(|_| Ok("session-token".into()));
        let mut limiter = open_limiter();
        limiter.expect_reset().returning(|_| Ok(()));
        let svc = AuthService::new(Arc::new(users), Arc::new(credentials), Arc::new(limiter));
        assert!(svc.login("alice@example.com", "password123").await.is_ok());
    }

    #[tokio::test]
    async fn current_user_rechecks_active_flag() {
        let user = account(false);
        let user_id = user.id;
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        let mut credentials = MockCredentials::new();
        credentials.expect_verify_token().returning(move |_| {
            Ok(SessionClaims {
                sub: user_id,
                username: "alice".into(),
                email: "alice@example.com".into(),
                iat: 0,
                exp: i64::MAX,
            })
        });
        let svc = AuthService::new(
            Arc::new(users),
            Arc::new(credentials),
            Arc::new(MockRateLimitStore::new()),
        );
        let err = svc.current_user("some-token").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn current_user_misses_when_the_row_is_gone() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut credentials = MockCredentials::new();
        credentials.expect_verify_token().returning(|_| {
            Ok(SessionClaims {
                sub: Uuid::new_v4(),
                username: "gone".into(),
                email: "gone@example.com".into(),
                iat: 0,
                exp: i64::MAX,
            })
        });
        let svc = AuthService::new(
            Arc::new(users),
            Arc::new(credentials),
            Arc::new(MockRateLimitStore::new()),
        );
        let err = svc.current_user("some-token").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(kind, _) if kind == "User"));
    }
}
