use std::sync::Arc;

use log::{error, info, warn};

use crate::camera::{self, FrameSource};
use crate::clock::MonotonicUptime;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::storage::block_storage::BlockStorage;
use crate::storage::{AssetStore, FileStorage};
use crate::web_interface::{AppState, WebServer};

/// Owns the configuration and wires every component from it.
pub struct Controller {
    pub config: Config,
    state: AppState,
}

impl Controller {
    /// Brings the camera and storage up.
    ///
    /// A camera that cannot be configured is fatal. Storage that cannot be
    /// prepared is not: the server still streams, and storage requests fail
    /// one by one until the root becomes usable.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        let socket = config.socket_addr()?;
        info!("Configuring {:?} camera", config.camera.source);
        let frames = FrameSource::with_config(camera::driver_for(&config.camera), &config.camera)
            .map_err(|e| {
                error!("Camera initialization failed: {}", e);
                e
            })?;

        let storage: Arc<dyn BlockStorage> = match FileStorage::open(&config.storage.root) {
            Ok(storage) => Arc::new(storage),
            Err(e) => {
                warn!(
                    "Storage not available at {}: {}",
                    config.storage.root.display(),
                    e
                );
                Arc::new(FileStorage::at(&config.storage.root))
            }
        };

        let frames = Arc::new(frames);
        let assets = AssetStore::new(storage, frames.clone(), Arc::new(MonotonicUptime::new()));
        info!("Controller ready, will serve on {}", socket);

        Ok(Self {
            state: AppState {
                frames,
                assets,
                stream: config.stream.clone(),
            },
            config,
        })
    }

    /// Serves until Ctrl-C.
    pub async fn run(&self) -> Result<(), ControllerError> {
        let addr = self.config.socket_addr()?;
        let server = WebServer::new(self.state.clone());
        server.start(addr, shutdown_signal()).await?;

        let stats = self.state.frames.stats();
        info!(
            "Shut down after {} frame(s) acquired, {} released, {} failed acquisition(s)",
            stats.acquired, stats.released, stats.failed
        );
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => error!("Unable to listen for the shutdown signal: {}", e),
    }
}
