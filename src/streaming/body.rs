//! Adapters from blocking producers to async response bodies.
//!
//! Camera acquisition and file reads block, so every pull runs on the blocking
//! thread pool and the async side only moves finished chunks.

use std::io::{self, Read};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use log::{debug, error};

use super::session::{PullOutcome, StreamSession};

/// Turns a stream session into a body of multipart parts.
///
/// Each item is exactly one part. Empty pulls are retried after `backoff`. The
/// stream ends when the session closes; dropping the stream (client gone)
/// drops the session.
pub fn session_body(
    session: StreamSession,
    pull_buffer_size: usize,
    backoff: Duration,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let buffer = vec![0u8; pull_buffer_size];
    stream::unfold(Some((session, buffer)), move |state| async move {
        let (mut session, mut buffer) = state?;
        loop {
            let pulled = tokio::task::spawn_blocking(move || {
                let outcome = session.pull(&mut buffer);
                (session, buffer, outcome)
            })
            .await;

            let (returned_session, returned_buffer, outcome) = match pulled {
                Ok(result) => result,
                Err(e) => {
                    error!("Stream pull task failed: {}", e);
                    return None;
                }
            };
            session = returned_session;
            buffer = returned_buffer;

            match outcome {
                PullOutcome::Part(written) => {
                    let part = Bytes::copy_from_slice(&buffer[..written]);
                    return Some((Ok(part), Some((session, buffer))));
                }
                PullOutcome::Empty => tokio::time::sleep(backoff).await,
                PullOutcome::Closed => {
                    debug!("Stream session {} finished", session.id());
                    return None;
                }
            }
        }
    })
}

/// Streams a blocking reader in chunks of at most `chunk_size` bytes.
pub fn reader_body(
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let chunk_size = chunk_size.max(1);
    stream::unfold(Some(reader), move |state| async move {
        let mut reader = state?;
        let read = tokio::task::spawn_blocking(move || {
            let mut chunk = vec![0u8; chunk_size];
            let result = reader.read(&mut chunk).map(|n| {
                chunk.truncate(n);
                chunk
            });
            (reader, result)
        })
        .await;

        match read {
            Ok((_, Ok(chunk))) if chunk.is_empty() => None,
            Ok((reader, Ok(chunk))) => Some((Ok(Bytes::from(chunk)), Some(reader))),
            Ok((_, Err(e))) => {
                error!("Failed to read file chunk: {}", e);
                Some((Err(e), None))
            }
            Err(e) => {
                error!("File read task failed: {}", e);
                Some((Err(io::Error::new(io::ErrorKind::Other, e.to_string())), None))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::testing::ScriptedCamera;
    use crate::camera::FrameSource;
    use crate::error_handling::types::CameraError;
    use crate::streaming::encoder::{StreamEncoder, PART_OVERHEAD};
    use futures_util::StreamExt;
    use std::io::Cursor;
    use std::sync::Arc;

    #[tokio::test]
    async fn session_body_yields_one_part_per_item() {
        let (camera, probe) = ScriptedCamera::new(vec![9u8; 100]);
        let source = Arc::new(FrameSource::new(Box::new(camera)));
        let session = StreamSession::new(StreamEncoder::new(source));

        let parts: Vec<Bytes> = session_body(session, 4096, Duration::from_millis(1))
            .take(3)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(parts.len(), 3);
        for part in &parts {
            assert_eq!(part.len(), 100 + PART_OVERHEAD);
            assert!(part.starts_with(b"--frame\r\n"));
        }
        assert_eq!(probe.outstanding(), 0);
    }

    #[tokio::test]
    async fn session_body_retries_empty_pulls_and_ends_on_fatal_error() {
        let (camera, _probe) = ScriptedCamera::new(vec![9u8; 10]);
        let camera = camera.with_script(vec![
            Err(CameraError::CaptureUnavailable),
            Ok(()),
            Err(CameraError::DeviceLost("gone".to_string())),
        ]);
        let source = Arc::new(FrameSource::new(Box::new(camera)));
        let session = StreamSession::new(StreamEncoder::new(source));

        let parts: Vec<_> = session_body(session, 4096, Duration::from_millis(1))
            .collect()
            .await;

        assert_eq!(parts.len(), 1);
    }

    #[tokio::test]
    async fn reader_body_concatenates_to_original() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reader: Box<dyn Read + Send> = Box::new(Cursor::new(data.clone()));

        let chunks: Vec<Bytes> = reader_body(reader, 1024)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert!(chunks.iter().all(|c| c.len() <= 1024));
        assert_eq!(chunks.concat(), data);
    }
}
