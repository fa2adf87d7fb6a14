//! One-shot asynchronous readbacks.
//!
//! A [`Readback`] is handed out by whoever kicks off the copy and polled by the
//! consumer each frame. Consumers never block on it; when it is not ready
//! they skip their work for the frame.

use bevy::tasks::{block_on, AsyncComputeTaskPool, Task, TaskPool};
use futures_lite::future;

enum ReadbackState<T> {
    Pending(Task<T>),
    Ready(T),
    Taken,
}

pub struct Readback<T> {
    state: ReadbackState<T>,
}

impl<T: Send + 'static> Readback<T> {
    /// Runs `produce` on the async compute pool.
    pub fn spawn<F>(produce: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let pool = AsyncComputeTaskPool::get_or_init(TaskPool::default);
        let task = pool.spawn(async move { produce() });
        Self {
            state: ReadbackState::Pending(task),
        }
    }
}

impl<T> Readback<T> {
    /// A readback whose value is already available.
    pub fn ready(value: T) -> Self {
        Self {
            state: ReadbackState::Ready(value),
        }
    }

    fn poll(&mut self) {
        if let ReadbackState::Pending(task) = &mut self.state {
            if let Some(value) = block_on(future::poll_once(task)) {
                self.state = ReadbackState::Ready(value);
            }
        }
    }

    pub fn is_ready(&mut self) -> bool {
        self.poll();
        matches!(self.state, ReadbackState::Ready(_))
    }

    /// Blocks until the value is available. `None` if it was already taken.
    pub fn wait(self) -> Option<T> {
        match self.state {
            ReadbackState::Pending(task) => Some(block_on(task)),
            ReadbackState::Ready(value) => Some(value),
            ReadbackState::Taken => None,
        }
    }

    pub fn is_taken(&self) -> bool {
        matches!(self.state, ReadbackState::Taken)
    }

    /// Takes the value if the copy has completed. Returns `None` while pending
    /// and after the value has been taken.
    pub fn try_get(&mut self) -> Option<T> {
        self.poll();
        match std::mem::replace(&mut self.state, ReadbackState::Taken) {
            ReadbackState::Ready(value) => Some(value),
            other => {
                self.state = other;
                None
            }
        }
    }
}

impl<T> std::fmt::Debug for Readback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            ReadbackState::Pending(_) => "pending",
            ReadbackState::Ready(_) => "ready",
            ReadbackState::Taken => "taken",
        };
        f.debug_struct("Readback").field("state", &state).finish()
    }
}
