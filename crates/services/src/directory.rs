//! # User Directory Service
//!
//! Account creation, the admin listing, and reconciliation between the
//! external identity provider and the local user table. Usernames and emails
//! are lowercased here, before any port sees them, so the store only ever
//! holds one casing.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use domains::{
    AppError, Credentials, NewUser, PageRequest, Pagination, Result, Role, User, UserFilter,
    UserRepo,
};

use crate::validation;

pub const USERS_PAGE_SIZE: u32 = 10;

/// Registration request, as submitted.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Admin-created account. Role defaults to user when the caller omits it.
#[derive(Debug, Clone)]
pub struct AdminNewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub user_role: Option<i16>,
}

pub struct DirectoryService {
    users: Arc<dyn UserRepo>,
    credentials: Arc<dyn Credentials>,
}

impl DirectoryService {
    pub fn new(users: Arc<dyn UserRepo>, credentials: Arc<dyn Credentials>) -> Self {
        Self { users, credentials }
    }

    /// Self-service registration. Collects every field error before
    /// reporting, creates a regular active account, and issues a session.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, String)> {
        let mut errors = Vec::new();
        if input.username.is_empty() {
            errors.push("Username is required".to_string());
        } else if let Some(msg) = validation::error_message(validation::username(&input.username)) {
            errors.push(msg);
        }
        if input.email.is_empty() {
            errors.push("Email is required".to_string());
        } else if let Some(msg) = validation::error_message(validation::email(&input.email)) {
            errors.push(msg);
        }
        if input.password.is_empty() {
            errors.push("Password is required".to_string());
        } else if let Some(msg) = validation::error_message(validation::password(&input.password)) {
            errors.push(msg);
        }
        if input.confirm_password.is_empty() {
            errors.push("Password confirmation is required".to_string());
        } else if input.password != input.confirm_password {
            errors.push("Passwords do not match".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("; ")));
        }

        let password_hash = self.credentials.hash_password(&input.password)?;
        let user = self
            .create(
                &input.username,
                &input.email,
                password_hash,
                Role::User,
                true,
            )
            .await?;
        let token = self.credentials.issue_token(&user)?;
        info!(user_id = %user.id, "account registered");
        Ok((user, token))
    }

    /// Account creation from the admin surface. Password rules are not
    /// enforced here; the admin is trusted to pick one.
    pub async fn admin_create(&self, input: AdminNewUser) -> Result<User> {
        if input.username.is_empty() || input.email.is_empty() || input.password.is_empty() {
            return Err(AppError::validation(
                "Username, email, and password are required",
            ));
        }
        let role = match input.user_role {
            None => Role::User,
            Some(code) => Role::from_code(code).ok_or_else(|| {
                AppError::validation("Invalid user role. Must be 1 (admin) or 2 (user)")
            })?,
        };
        let password_hash = self.credentials.hash_password(&input.password)?;
        self.create(&input.username, &input.email, password_hash, role, true)
            .await
    }

    /// Uniqueness probes run before the insert so both collisions can be
    /// reported at once. The store's unique indexes still backstop the race
    /// between probe and insert.
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
        role: Role,
        active: bool,
    ) -> Result<User> {
        let username = username.to_lowercase();
        let email = email.to_lowercase();

        let report = self.users.exists(&email, &username).await?;
        let mut conflicts = Vec::new();
        if report.email_taken {
            conflicts.push("Email already registered");
        }
        if report.username_taken {
            conflicts.push("Username already taken");
        }
        if !conflicts.is_empty() {
            return Err(AppError::Conflict(conflicts.join("; ")));
        }

        self.users
            .insert(NewUser {
                username,
                email,
                password_hash,
                user_role: role,
                is_active: active,
            })
            .await
    }

    /// Syncs a provider-asserted identity into the local table. Absent email
    /// creates an account (empty password hash; the provider owns the
    /// credential); a drifted username is rewritten to the derivation from
    /// the email. Converges: calling twice changes nothing the second time.
    pub async fn reconcile_provider_identity(
        &self,
        email: &str,
        suggested_username: Option<&str>,
    ) -> Result<User> {
        let email = email.to_lowercase();
        let derived = derive_username(&email);

        match self.users.find_by_email(&email).await? {
            None => {
                let username = suggested_username
                    .map(|u| u.to_lowercase())
                    .unwrap_or_else(|| derived.clone());
                let user = self
                    .users
                    .insert(NewUser {
                        username,
                        email,
                        password_hash: String::new(),
                        user_role: Role::User,
                        is_active: true,
                    })
                    .await?;
                info!(user_id = %user.id, "provider account provisioned");
                Ok(user)
            }
            Some(user) if user.username != derived => {
                info!(user_id = %user.id, from = %user.username, to = %derived,
                      "provider username reconciled");
                self.users.update_username(user.id, &derived).await
            }
            Some(user) => Ok(user),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users.find_by_id(id).await
    }

    /// Filtered page of the directory, newest accounts first.
    pub async fn list_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, Pagination)> {
        let (rows, total) = self.users.list(filter, page).await?;
        Ok((rows, Pagination::new(&page, total)))
    }
}

/// The local part of the email, lowercased. The whole email is the fallback
/// for the degenerate no-@ case.
fn derive_username(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or(email)
        .to_lowercase()
}
