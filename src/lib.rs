//! flowboard: a multi-tenant Kanban board and release roadmap.
//!
//! | Module | Responsibility |
//! |---|---|
//! | `board` | Board and roadmap controllers, filters, view preferences, events |
//! | `store` | `Repository` implementations (hosted REST, local SQLite) |
//! | `web` | JSON API and WebSocket event stream |
//! | `config` | `flowboard.toml` and environment overrides |
//! | `errors` | Controller and preference error types |
//! | `logging` | Tracing subscriber setup |
//!
//! Domain types and the `Repository` trait live in `flowboard-common`.

pub mod board;
pub mod config;
pub mod errors;
pub mod logging;
pub mod store;
pub mod web;
