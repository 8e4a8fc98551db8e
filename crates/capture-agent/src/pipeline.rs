//! Capture session framework.
//!
//! `CaptureFramework` runs at most one capture session at a time. Each session
//! drives a `CaptureBackend` in a spawned task and is told to stop through a
//! oneshot channel. A session that ends before a stop was requested is
//! reported to its `FailureHandler`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use capture_core::{Recording, RecordingId};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::PipelineError;

/// A media capture backend.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Check that `recording` can be captured before a session starts.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` if the recording properties
    /// cannot drive a capture.
    fn validate(&self, _recording: &Recording) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Capture `recording` until `stop` fires or the capture ends on its own.
    ///
    /// A dropped `stop` sender counts as a stop request.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture cannot start or fails while running.
    async fn run(
        &self,
        recording: &Recording,
        stop: oneshot::Receiver<()>,
    ) -> Result<(), PipelineError>;
}

/// Receives the outcome of sessions that end without a stop request.
pub trait FailureHandler: Send + Sync {
    /// The backend failed. Called at most once per session.
    fn capture_failed(&self, id: &RecordingId, error: &PipelineError);

    /// The backend finished successfully on its own.
    fn capture_completed(&self, _id: &RecordingId) {}
}

struct ActiveCapture {
    generation: u64,
    id: RecordingId,
    stop_tx: Option<oneshot::Sender<()>>,
    /// Set by whichever side settles the session first: `stop` or the task.
    settled: Arc<AtomicBool>,
    task: JoinHandle<Result<(), PipelineError>>,
}

type Slot = Arc<Mutex<Option<ActiveCapture>>>;

/// Supervises a single capture session at a time.
pub struct CaptureFramework {
    backend: Arc<dyn CaptureBackend>,
    active: Slot,
    generation: AtomicU64,
}

impl CaptureFramework {
    /// Create a framework driving `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            active: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns true if a session is running.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Id of the recording being captured, if any.
    #[must_use]
    pub fn active_recording(&self) -> Option<RecordingId> {
        self.active.lock().as_ref().map(|active| active.id.clone())
    }

    /// Start capturing `recording`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AlreadyCapturing` if a session is running, or
    /// the backend's validation error.
    pub fn start(
        &self,
        recording: Recording,
        handler: Arc<dyn FailureHandler>,
    ) -> Result<(), PipelineError> {
        let mut slot = self.active.lock();
        if let Some(active) = slot.as_ref() {
            if !active.task.is_finished() {
                return Err(PipelineError::AlreadyCapturing);
            }
        }

        self.backend.validate(&recording)?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let id = recording.id.clone();
        let (stop_tx, stop_rx) = oneshot::channel();
        let settled = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(supervise(
            Arc::clone(&self.backend),
            recording,
            stop_rx,
            handler,
            Arc::clone(&settled),
            Arc::clone(&self.active),
            generation,
        ));

        tracing::info!(recording_id = %id, "Capture started");

        // The task cannot clear the slot before this insert; the lock is held.
        *slot = Some(ActiveCapture {
            generation,
            id,
            stop_tx: Some(stop_tx),
            settled,
            task,
        });

        Ok(())
    }

    /// Stop the running session, waiting up to `timeout` for the backend.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotCapturing` if no session is running,
    /// `PipelineError::StopTimeout` if the backend had to be aborted, or the
    /// backend's own error.
    pub async fn stop(&self, timeout: Duration) -> Result<(), PipelineError> {
        let mut active = self.active.lock().take().ok_or(PipelineError::NotCapturing)?;

        if active.settled.swap(true, Ordering::SeqCst) {
            // The session already ended and is reporting to its handler.
            return Err(PipelineError::NotCapturing);
        }

        if let Some(stop_tx) = active.stop_tx.take() {
            // The backend may already be gone; the join below reports why.
            let _ = stop_tx.send(());
        }

        match tokio::time::timeout(timeout, &mut active.task).await {
            Ok(Ok(result)) => {
                tracing::info!(recording_id = %active.id, ok = result.is_ok(), "Capture stopped");
                result
            }
            Ok(Err(join_error)) => Err(PipelineError::Aborted(join_error.to_string())),
            Err(_) => {
                active.task.abort();
                tracing::warn!(
                    recording_id = %active.id,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Capture did not stop in time, aborted"
                );
                Err(PipelineError::StopTimeout(timeout))
            }
        }
    }
}

async fn supervise(
    backend: Arc<dyn CaptureBackend>,
    recording: Recording,
    stop_rx: oneshot::Receiver<()>,
    handler: Arc<dyn FailureHandler>,
    settled: Arc<AtomicBool>,
    slot: Slot,
    generation: u64,
) -> Result<(), PipelineError> {
    let result = backend.run(&recording, stop_rx).await;

    if settled.swap(true, Ordering::SeqCst) {
        // A stop was requested; `stop` returns the result.
        return result;
    }

    {
        let mut active = slot.lock();
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
        }
    }

    match &result {
        Ok(()) => {
            tracing::info!(recording_id = %recording.id, "Capture ended on its own");
            handler.capture_completed(&recording.id);
        }
        Err(e) => {
            tracing::error!(recording_id = %recording.id, error = %e, "Capture failed");
            handler.capture_failed(&recording.id, e);
        }
    }

    result
}

/// Scriptable backend for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::{async_trait, oneshot, CaptureBackend, PipelineError, Recording, RecordingId};
    use parking_lot::Mutex;
    use std::time::Duration;

    /// How a `MockBackend` session behaves.
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Run until stopped, then succeed.
        RunUntilStopped,
        /// Fail with the message after the delay unless stopped first.
        FailAfter(Duration, String),
        /// Succeed after the delay unless stopped first.
        FinishAfter(Duration),
        /// Run until stopped, then fail with the message.
        FailOnStop(String),
        /// Never return, even when stopped.
        IgnoreStop,
    }

    /// Backend that follows a scripted behavior and records what it ran.
    #[derive(Debug)]
    pub struct MockBackend {
        behavior: Mutex<MockBehavior>,
        started: Mutex<Vec<RecordingId>>,
    }

    impl MockBackend {
        /// Create a backend with the given behavior.
        #[must_use]
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                started: Mutex::new(Vec::new()),
            }
        }

        /// Change the behavior of future sessions.
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock() = behavior;
        }

        /// Recordings this backend has been asked to capture.
        #[must_use]
        pub fn started(&self) -> Vec<RecordingId> {
            self.started.lock().clone()
        }
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::new(MockBehavior::RunUntilStopped)
        }
    }

    #[async_trait]
    impl CaptureBackend for MockBackend {
        async fn run(
            &self,
            recording: &Recording,
            stop: oneshot::Receiver<()>,
        ) -> Result<(), PipelineError> {
            self.started.lock().push(recording.id.clone());
            let behavior = self.behavior.lock().clone();

            match behavior {
                MockBehavior::RunUntilStopped => {
                    let _ = stop.await;
                    Ok(())
                }
                MockBehavior::FailAfter(delay, message) => {
                    tokio::select! {
                        _ = stop => Ok(()),
                        () = tokio::time::sleep(delay) => Err(PipelineError::Backend(message)),
                    }
                }
                MockBehavior::FinishAfter(delay) => {
                    tokio::select! {
                        _ = stop => Ok(()),
                        () = tokio::time::sleep(delay) => Ok(()),
                    }
                }
                MockBehavior::FailOnStop(message) => {
                    let _ = stop.await;
                    Err(PipelineError::Backend(message))
                }
                MockBehavior::IgnoreStop => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }
}
