//! # Physician Finder Core
//!
//! Backend-independent logic for Physician Finder: data models, search
//! planning, the store abstraction, and the actions that the CLI and HTTP
//! server call.
//!
//! This crate contains no sqlx, axum, or filesystem I/O. The Postgres store
//! lives in the application crate; [`store::memory::InMemoryStore`] backs
//! tests and local experiments.
//!
//! Every action returns an [`action::ActionState`] rather than an error:
//! validation problems, missing rows and store failures are all reported as
//! values with a user-facing message.

pub mod accounts;
pub mod action;
pub mod models;
pub mod physicians;
pub mod search;
pub mod store;
pub mod text;
