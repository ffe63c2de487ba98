//! # Capture Sessions
//!
//! A capture session collects the chunks of one voice recording and hands
//! back a single completed buffer. The widget streams its recorder chunks in
//! the `audio` field of a multipart upload; each chunk becomes a "data
//! available" event and the end of the upload becomes "stop".
//!
//! ## Lifecycle:
//! 1. **start**: spawns the collector task, returns a handle and the session
//! 2. **push**: one call per recorded chunk (empty chunks are ignored)
//! 3. **stop**: marks the recording complete
//! 4. **finish**: awaits the collector and yields the recording or an error
//!
//! ## Ordering:
//! Data and stop travel through the same mpsc channel, so the collector sees
//! stop only after every chunk pushed before it.

use super::AudioError;
use actix_web::web::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pending events the collector buffers before `push` starts waiting.
const CHANNEL_CAPACITY: usize = 64;

enum CaptureEvent {
    Data(Bytes),
    Stop,
}

/// A completed recording: the concatenated chunks in arrival order.
#[derive(Debug, Clone)]
pub struct Recording {
    pub session_id: Uuid,
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Producer side of a capture session.
#[derive(Clone)]
pub struct CaptureHandle {
    session_id: Uuid,
    tx: mpsc::Sender<CaptureEvent>,
}

impl CaptureHandle {
    /// Deliver one recorded chunk.
    ///
    /// Fails with `CaptureAborted` once the collector has stopped listening;
    /// the reason it stopped is reported by [`CaptureSession::finish`].
    pub async fn push(&self, chunk: Bytes) -> Result<(), AudioError> {
        self.tx
            .send(CaptureEvent::Data(chunk))
            .await
            .map_err(|_| AudioError::CaptureAborted)
    }

    /// Mark the recording complete.
    pub async fn stop(self) {
        if self.tx.send(CaptureEvent::Stop).await.is_err() {
            debug!(session_id = %self.session_id, "Stop sent to a finished capture session");
        }
    }
}

/// Consumer side of a capture session.
pub struct CaptureSession {
    session_id: Uuid,
    task: JoinHandle<Result<Recording, AudioError>>,
}

impl CaptureSession {
    /// Start collecting a recording of at most `max_bytes`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(max_bytes: usize) -> (CaptureHandle, CaptureSession) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(collect(session_id, rx, max_bytes));

        debug!(session_id = %session_id, max_bytes, "Capture session started");

        (
            CaptureHandle { session_id, tx },
            CaptureSession { session_id, task },
        )
    }

    pub fn id(&self) -> Uuid {
        self.session_id
    }

    /// Wait for the collector to finish.
    ///
    /// ## Returns:
    /// - **Ok(Recording)**: stop arrived after at least one non-empty chunk
    /// - **Err(EmptyRecording)**: stop arrived before any audio
    /// - **Err(CaptureAborted)**: every handle was dropped without stop
    /// - **Err(RecordingTooLarge)**: the byte limit was exceeded
    pub async fn finish(self) -> Result<Recording, AudioError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Capture task failed");
                Err(AudioError::CaptureAborted)
            }
        }
    }
}

async fn collect(
    session_id: Uuid,
    mut rx: mpsc::Receiver<CaptureEvent>,
    max_bytes: usize,
) -> Result<Recording, AudioError> {
    let started_at = Utc::now();
    let mut bytes = Vec::new();
    let mut chunk_count = 0usize;

    while let Some(event) = rx.recv().await {
        match event {
            CaptureEvent::Data(chunk) => {
                if chunk.is_empty() {
                    continue;
                }

                if bytes.len() + chunk.len() > max_bytes {
                    warn!(
                        session_id = %session_id,
                        received = bytes.len() + chunk.len(),
                        limit = max_bytes,
                        "Recording exceeds size limit"
                    );
                    return Err(AudioError::RecordingTooLarge { limit: max_bytes });
                }

                bytes.extend_from_slice(&chunk);
                chunk_count += 1;
            }
            CaptureEvent::Stop => {
                if chunk_count == 0 {
                    return Err(AudioError::EmptyRecording);
                }

                info!(
                    session_id = %session_id,
                    chunks = chunk_count,
                    bytes = bytes.len(),
                    "Recording captured"
                );

                return Ok(Recording {
                    session_id,
                    bytes,
                    chunk_count,
                    started_at,
                    finished_at: Utc::now(),
                });
            }
        }
    }

    Err(AudioError::CaptureAborted)
}
