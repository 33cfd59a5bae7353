//! # Classroll
//!
//! A student records API (students, attendance and grades behind role-gated
//! bearer-token auth), usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! classroll = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use classroll::auth::TokenService;
//! use classroll::server::{AppState, create_router};
//! use classroll::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/classroll.db")?;
//! store.initialize()?;
//!
//! let tokens = TokenService::new(b"signing-secret", chrono::Duration::minutes(30))?;
//! let state = Arc::new(AppState::new(Arc::new(store), tokens));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `classroll` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
