//! Shared handler state.

use std::sync::Arc;

use domains::{Credentials, IdentityProvider};
use services::{AuthService, DirectoryService, ForumService};

use crate::metrics::ApiMetrics;

/// Everything a handler can reach. Cheap to clone; axum clones it per route.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub directory: Arc<DirectoryService>,
    pub forum: Arc<ForumService>,
    pub credentials: Arc<dyn Credentials>,
    /// External identity provider. `None` runs the API credential-only and
    /// the pass-through endpoints report a server fault.
    pub provider: Option<Arc<dyn IdentityProvider>>,
    pub metrics: Arc<ApiMetrics>,
    /// Mark session cookies `Secure`; off for plain-HTTP development.
    pub cookie_secure: bool,
}
