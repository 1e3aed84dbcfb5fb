//! HTTP surface: health endpoint, WebSocket upgrade, static client files

pub mod routes;

pub use routes::build_router;
