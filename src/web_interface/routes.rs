use std::time::Duration;

use log::{error, info};
use rust_embed::RustEmbed;
use warp::http::{header, Response, StatusCode};
use warp::hyper::Body;
use warp::{reply, Filter, Rejection, Reply};

use super::types::{
    ApiError, AppState, FileQuery, CAPTURE_DISPOSITION, DOWNLOAD_CHUNK_SIZE, X_FILENAME,
};
use crate::error_handling::types::{AssetError, StorageError};
use crate::storage::types::AssetEntry;
use crate::streaming::body::{reader_body, session_body};
use crate::streaming::{StreamEncoder, StreamSession, STREAM_CONTENT_TYPE};

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct PanelAssets;

fn text(status: StatusCode, message: &str) -> reply::Response {
    reply::with_status(message.to_string(), status).into_response()
}

fn internal_error(what: &str, e: impl std::fmt::Display) -> reply::Response {
    error!("{} task failed: {}", what, e);
    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// GET /
pub fn control_panel_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        let Some(page) = PanelAssets::get("index.html") else {
            error!("Control panel page is missing from the embedded assets");
            return Err(warp::reject::not_found());
        };
        let mime = mime_guess::from_path("index.html").first_or_text_plain();
        Ok::<_, Rejection>(
            reply::with_header(
                page.data.into_owned(),
                header::CONTENT_TYPE,
                mime.to_string(),
            )
            .into_response(),
        )
    })
}

/// GET /stream
pub fn stream_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("stream")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let state = state.clone();
            async move {
                let session = StreamSession::new(StreamEncoder::new(state.frames.clone()));
                let body = session_body(
                    session,
                    state.stream.pull_buffer_size,
                    Duration::from_millis(state.stream.empty_pull_backoff_ms),
                );
                let response = Response::builder()
                    .header(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)
                    .header(header::CACHE_CONTROL, "no-cache, no-store")
                    .body(Body::wrap_stream(body));
                match response {
                    Ok(response) => Ok::<_, Rejection>(response.into_response()),
                    Err(e) => Ok(internal_error("Stream response", e)),
                }
            }
        })
}

/// GET /capture
pub fn capture_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("capture")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let assets = state.assets.clone();
            async move {
                let captured = tokio::task::spawn_blocking(move || assets.capture_and_store()).await;
                let response = match captured {
                    Ok(Ok(asset)) => {
                        let response = Response::builder()
                            .header(header::CONTENT_TYPE, "image/jpeg")
                            .header(header::CONTENT_DISPOSITION, CAPTURE_DISPOSITION)
                            .header(X_FILENAME, asset.name.as_str())
                            .body(Body::from(asset.data));
                        match response {
                            Ok(response) => response.into_response(),
                            Err(e) => internal_error("Capture response", e),
                        }
                    }
                    Ok(Err(AssetError::Camera(_))) => {
                        text(StatusCode::INTERNAL_SERVER_ERROR, "Camera capture failed")
                    }
                    Ok(Err(AssetError::Storage(StorageError::WriteFailed))) => text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to write file to storage",
                    ),
                    Ok(Err(AssetError::Storage(_))) => text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to open file on storage",
                    ),
                    Err(e) => internal_error("Capture", e),
                };
                Ok::<_, Rejection>(response)
            }
        })
}

/// GET /files
pub fn list_files_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("files")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let assets = state.assets.clone();
            async move {
                let listed = tokio::task::spawn_blocking(move || {
                    assets
                        .list()
                        .map(|entries| entries.collect::<Vec<AssetEntry>>())
                })
                .await;
                let response = match listed {
                    Ok(Ok(entries)) => reply::json(&entries).into_response(),
                    Ok(Err(_)) => reply::with_status(
                        reply::json(&ApiError {
                            error: "Failed to open storage".to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                    .into_response(),
                    Err(e) => internal_error("Listing", e),
                };
                Ok::<_, Rejection>(response)
            }
        })
}

/// GET /download?file=<name>
pub fn download_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("download")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<FileQuery>())
        .and_then(move |query: FileQuery| {
            let assets = state.assets.clone();
            async move {
                let Some(name) = query.name().map(str::to_string) else {
                    return Ok::<_, Rejection>(text(
                        StatusCode::BAD_REQUEST,
                        "Missing file parameter",
                    ));
                };
                let opened = tokio::task::spawn_blocking(move || assets.read(&name)).await;
                let response = match opened {
                    Ok(Ok(asset)) => {
                        let response = Response::builder()
                            .header(header::CONTENT_TYPE, "application/octet-stream")
                            .header(header::CONTENT_LENGTH, asset.size)
                            .body(Body::wrap_stream(reader_body(
                                asset.reader,
                                DOWNLOAD_CHUNK_SIZE,
                            )));
                        match response {
                            Ok(response) => response.into_response(),
                            Err(e) => internal_error("Download response", e),
                        }
                    }
                    Ok(Err(StorageError::NotFound)) => {
                        text(StatusCode::NOT_FOUND, "File not found")
                    }
                    Ok(Err(StorageError::InvalidName(_))) => {
                        text(StatusCode::BAD_REQUEST, "Invalid file name")
                    }
                    Ok(Err(_)) => text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to open file on storage",
                    ),
                    Err(e) => internal_error("Download", e),
                };
                Ok(response)
            }
        })
}

/// DELETE /delete?file=<name>
pub fn delete_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("delete")
        .and(warp::path::end())
        .and(warp::delete())
        .and(warp::query::<FileQuery>())
        .and_then(move |query: FileQuery| {
            let assets = state.assets.clone();
            async move {
                let Some(name) = query.name().map(str::to_string) else {
                    return Ok::<_, Rejection>(text(
                        StatusCode::BAD_REQUEST,
                        "Missing file parameter",
                    ));
                };
                let requested = name.clone();
                let removed = tokio::task::spawn_blocking(move || assets.delete(&name)).await;
                let response = match removed {
                    Ok(Ok(())) => text(StatusCode::OK, "File deleted"),
                    Ok(Err(StorageError::NotFound)) => {
                        info!("Delete of missing file {}", requested);
                        text(StatusCode::NOT_FOUND, "File not found")
                    }
                    Ok(Err(StorageError::InvalidName(_))) => {
                        text(StatusCode::BAD_REQUEST, "Invalid file name")
                    }
                    Ok(Err(_)) => {
                        text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete file")
                    }
                    Err(e) => internal_error("Delete", e),
                };
                Ok(response)
            }
        })
}
