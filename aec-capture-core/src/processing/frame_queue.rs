//! Bounded single-producer/single-consumer sample queue.
//!
//! The producer half lives inside the engine callback on the real-time
//! thread; the consumer half is drained by the collector thread. Both halves
//! are wait-free and all storage is allocated up front by `frame_queue`.

use rtrb::{Consumer, Producer, RingBuffer};

/// Create a queue able to hold `capacity` samples.
pub fn frame_queue(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (FrameProducer { inner: producer }, FrameConsumer { inner: consumer })
}

/// Real-time side of the queue.
pub struct FrameProducer {
    inner: Producer<f32>,
}

impl FrameProducer {
    /// Push a whole batch, or nothing if there is not enough room.
    ///
    /// Never blocks. Partial batches are never written so a full queue
    /// drops whole batches and keeps the stored stream contiguous per batch.
    pub fn push_batch(&mut self, samples: &[f32]) -> bool {
        match self.inner.write_chunk_uninit(samples.len()) {
            Ok(chunk) => {
                chunk.fill_from_iter(samples.iter().copied());
                true
            }
            Err(_) => false,
        }
    }
}

/// Collector side of the queue.
pub struct FrameConsumer {
    inner: Consumer<f32>,
}

impl FrameConsumer {
    /// Move every queued sample into `out`, preserving order.
    ///
    /// Returns the number of samples moved.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.inner.slots();
        if available == 0 {
            return 0;
        }
        match self.inner.read_chunk(available) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out.extend_from_slice(first);
                out.extend_from_slice(second);
                chunk.commit_all();
                available
            }
            Err(_) => 0,
        }
    }
}
