//! HTTP API and browser front end

pub mod handler;
pub mod server;

pub use handler::ApiError;
pub use server::{router, HttpServer};
