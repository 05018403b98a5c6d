//! Bounded hand-off of landmark frames from a capture thread to the pipeline.
//!
//! The producer never blocks: when the queue is full the oldest pending frame
//! is dropped, so the consumer always works on recent data.

use crate::features::LandmarkFrame;
use log::debug;
use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// One detector result with its capture time
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Landmarks, or `None` when no face was found
    pub frame: Option<LandmarkFrame>,
    /// Monotonic capture time in seconds
    pub timestamp_s: f64,
}

#[derive(Debug)]
struct QueueState {
    frames: VecDeque<FrameInput>,
    capacity: usize,
    closed: bool,
    dropped: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer half
#[derive(Debug, Clone)]
pub struct FrameSender {
    shared: Arc<Shared>,
}

/// Consumer half
#[derive(Debug)]
pub struct FrameReceiver {
    shared: Arc<Shared>,
}

/// Create a queue holding at most `capacity` frames (at least one)
#[must_use]
pub fn channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
            dropped: 0,
        }),
        ready: Condvar::new(),
    });
    (
        FrameSender {
            shared: Arc::clone(&shared),
        },
        FrameReceiver { shared },
    )
}

impl FrameSender {
    /// Enqueue a frame; returns `true` if an older frame was evicted
    ///
    /// Frames pushed after `close` are discarded.
    pub fn push(&self, input: FrameInput) -> bool {
        let mut state = self.shared.lock();
        if state.closed {
            return false;
        }

        let evicted = if state.frames.len() >= state.capacity {
            state.frames.pop_front();
            state.dropped += 1;
            debug!("Frame queue full, dropped oldest frame");
            true
        } else {
            false
        };

        state.frames.push_back(input);
        drop(state);
        self.shared.ready.notify_one();
        evicted
    }

    /// Mark the end of the stream; the receiver drains what is left
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_all();
    }
}

impl FrameReceiver {
    /// Wait up to `timeout` for the next frame
    ///
    /// Returns `None` on timeout or once the queue is closed and empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FrameInput> {
        let state = self.shared.lock();
        let (mut state, _) = self
            .shared
            .ready
            .wait_timeout_while(state, timeout, |s| s.frames.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.frames.pop_front()
    }

    /// Next frame if one is ready
    pub fn try_recv(&self) -> Option<FrameInput> {
        self.shared.lock().frames.pop_front()
    }

    /// Whether the sender closed the queue and every frame was consumed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let state = self.shared.lock();
        state.closed && state.frames.is_empty()
    }

    /// Frames evicted because the queue was full
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }
}
