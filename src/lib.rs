//! # Physician Finder
//!
//! Search over the NPPES physician directory, backed by Postgres.
//!
//! Registry records are imported into a `physicians` table, searched with
//! trigram similarity and prefix full-text matching, and served through a
//! CLI and a JSON HTTP API. A small account model (users, organizations,
//! memberships) lives alongside the catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌────────────────┐
//! │ NPPES JSON  │──▶│   import    │──▶│   Postgres     │
//! │  / JSONL    │   │ normalize   │   │ pg_trgm+PostGIS│
//! └─────────────┘   └─────────────┘   └───────┬────────┘
//!                                             │ PgStore
//!                       ┌─────────────────────┤
//!                       ▼                     ▼
//!                  ┌──────────┐         ┌──────────┐
//!                  │   CLI    │         │   HTTP   │
//!                  │ (finder) │         │  (axum)  │
//!                  └──────────┘         └──────────┘
//! ```
//!
//! Validation, paging and the action result envelope live in
//! `physician_finder_core`; this crate supplies the Postgres store and the
//! outer surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Connection pool |
//! | [`migrate`] | Schema and extension checks |
//! | [`pg_store`] | Postgres store |
//! | [`import`] | NPPES record import |
//! | [`search`] | `finder search` |
//! | [`get`] | `finder get` |
//! | [`stats`] | `finder stats` |
//! | [`server`] | HTTP API |

pub mod config;
pub mod db;
pub mod get;
pub mod import;
pub mod migrate;
pub mod pg_store;
pub mod search;
pub mod server;
pub mod stats;
