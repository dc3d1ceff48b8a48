//! Convenience layer over a Supabase project: an explicitly constructed
//! client, loading notifications, filter helpers, and a per-name guard
//! against repeated or overlapping edge-function calls.

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod loading;
pub mod metrics;
pub mod models;
pub mod query;

pub use client::SupabaseClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use guard::{CallGuard, Rejection};
pub use loading::{Loading, LoadingObserver, LoadingScope};
pub use models::{FileObject, ListOptions, Session, UploadResponse, User};
pub use query::{Filter, Predicate};
