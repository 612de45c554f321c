// Modules - shared infrastructure used by the proxy service

pub mod config;
pub mod logger;
pub mod paths;
pub mod totp;
