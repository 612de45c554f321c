use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS for the operator console; credentials ride the session
/// cookie or the explicit session header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
