//! Public entry points: the HTTP router and server.

pub mod http;

pub use http::{router, serve, ApiState};
