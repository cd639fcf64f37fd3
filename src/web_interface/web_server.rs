use std::future::Future;
use std::net::SocketAddr;

use log::info;
use warp::{Filter, Rejection, Reply};

use super::routes::*;
use super::types::AppState;
use crate::error_handling::types::WebError;

/// Every endpoint, with request logging.
pub fn app_routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    control_panel_route()
        .or(stream_route(state.clone()))
        .or(capture_route(state.clone()))
        .or(list_files_route(state.clone()))
        .or(download_route(state.clone()))
        .or(delete_route(state))
        .with(warp::log("camserve::http"))
}

/// HTTP front end of the camera
pub struct WebServer {
    state: AppState,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serves on `addr` until `shutdown` resolves.
    pub async fn start<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(app_routes(self.state.clone()))
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;

        info!("HTTP server listening on http://{}", bound);
        server.await;
        info!("HTTP server stopped");
        Ok(())
    }
}
