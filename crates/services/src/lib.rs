//! # Duskforum Services
//!
//! Business rules over the domain ports: forum content, the user directory,
//! and the login flow. Everything here is storage- and transport-agnostic;
//! adapters are injected as trait objects.

pub mod auth;
pub mod directory;
pub mod forum;
pub mod validation;

pub use auth::AuthService;
pub use directory::{AdminNewUser, DirectoryService, RegisterInput, USERS_PAGE_SIZE};
pub use forum::{ForumService, COMMENTS_PAGE_SIZE, DEFAULT_CATEGORY_COLOR, THREADS_PAGE_SIZE};
