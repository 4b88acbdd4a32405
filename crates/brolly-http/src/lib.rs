//! HTTP surface for the brolly lending system
//!
//! A small request/response layer over the lending engine, matching the
//! relational-backend access style: discrete reads and writes, no push
//! channel. Realtime deployments talk to the store directly and use the
//! change hub instead of polling these routes.

pub mod server;

pub use server::{serve, serve_on, HttpServeError, HttpServerConfig};
