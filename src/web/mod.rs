//! JSON API and WebSocket event stream over the board and roadmap
//! controllers. Front-ends call the controller operations through `api`
//! and receive `BoardEvent`s as JSON text frames on `/ws`.

pub mod api;
pub mod server;
pub mod ws;
