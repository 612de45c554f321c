// Middleware - axum layers

pub mod auth;
pub mod cors;

pub use auth::{auth_middleware, SessionToken};
pub use cors::cors_layer;
