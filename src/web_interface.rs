//! HTTP interface of the camera: control panel, live stream, capture and file
//! management endpoints, served with warp.

pub mod routes;
pub mod types;
pub mod web_server;

pub use types::{ApiError, AppState};
pub use web_server::{app_routes, WebServer};
