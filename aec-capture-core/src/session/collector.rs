use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::error::CaptureError;
use crate::processing::frame_queue::FrameConsumer;

/// How long the collector sleeps when the queue is empty.
const IDLE_INTERVAL: Duration = Duration::from_millis(5);

/// Non-real-time thread that drains the hand-off queue into the session buffer.
///
/// The buffer is owned by the thread until `finish` joins it, so nothing
/// else can observe a half-filled capture.
pub(crate) struct Collector {
    running: Arc<AtomicBool>,
    handle: thread::JoinHandle<Vec<f32>>,
}

impl Collector {
    pub(crate) fn spawn(mut consumer: FrameConsumer, capacity: usize) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("aec-collector".into())
            .spawn(move || {
                let mut buffer = Vec::with_capacity(capacity);
                while flag.load(Ordering::Acquire) {
                    if consumer.drain_into(&mut buffer) == 0 {
                        thread::sleep(IDLE_INTERVAL);
                    }
                }
                consumer.drain_into(&mut buffer);
                buffer
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn collector thread: {}", e)))?;

        Ok(Self { running, handle })
    }

    /// Stop collecting and return everything received, in capture order.
    ///
    /// Call only after the engine has stopped so no producer writes remain.
    pub(crate) fn finish(self) -> Result<Vec<f32>, CaptureError> {
        self.running.store(false, Ordering::Release);
        self.handle
            .join()
            .map_err(|_| CaptureError::Unknown("collector thread panicked".into()))
    }
}
