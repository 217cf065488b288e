//! Request handlers, one module per resource.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod health;
pub mod reactions;
pub mod threads;
pub mod users;

/// Treats absent and blank strings the same way, as the upstream clients do.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
