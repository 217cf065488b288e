//! # Duskforum Domains
//!
//! Core entities, the shared error type, and the ports every adapter plugs
//! into. This crate has no knowledge of HTTP, SQL, or any concrete backend.

pub mod error;
pub mod models;
pub mod traits;

pub use error::{AppError, Result};
pub use models::{
    CategoryRef, Comment, CommentView, ExistsReport, ForumCategory, NewCategory, NewComment,
    NewThread, NewUser, PageRequest, Pagination, RateLimitDecision, Reaction, ReactionGroup,
    ReactionKey, ReactionRow, Role, SessionClaims, SortOrder, TargetType, Thread, ThreadFilter,
    ThreadPatch, ThreadSort, ThreadSummary, User, UserFilter, UserRef,
};
pub use traits::{
    CategoryRepo, CommentRepo, Credentials, IdentityProvider, ProviderIdentity, RateLimitStore,
    ReactionRepo, ThreadRepo, UserRepo,
};
