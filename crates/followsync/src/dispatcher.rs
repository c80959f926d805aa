//! Single-flight request admission.
//!
//! At most one request is processed at a time. A request arriving while
//! another is in flight waits in a bounded FIFO queue; when the queue is full
//! the oldest waiting request is dropped to make room. Independently of
//! whether anything is in flight, requests arriving closer together than the
//! cooldown are rejected outright.

use crate::TimeSource;
use core::time::Duration;
use std::collections::VecDeque;

/// The "nothing here" slot value.
pub const SENTINEL: &str = "0";

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Minimum spacing between admitted requests.
    pub cooldown: Duration,
    /// Requests that may wait behind the in-flight one.
    pub queue_capacity: usize,
    /// Pause between finishing one request and starting the next queued one.
    pub drain_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(500),
            queue_capacity: 8,
            drain_delay: Duration::from_millis(50),
        }
    }
}

/// Outcome of offering a raw request to the [`Dispatcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Nothing was in flight; process this request now.
    Start(String),
    /// Queued behind the in-flight request. `evicted` is the oldest waiting
    /// request, dropped because the queue was full.
    Queued { evicted: Option<String> },
    /// Arrived within the cooldown of the previous admission.
    Cooldown,
    /// Empty or the sentinel; never a request.
    Ignored,
}

#[derive(Debug)]
pub struct Dispatcher<T> {
    config: DispatcherConfig,
    clock: T,
    busy: bool,
    queue: VecDeque<String>,
    last_admitted: Option<u64>,
}

impl<T: TimeSource> Dispatcher<T> {
    pub fn new(config: DispatcherConfig, clock: T) -> Self {
        let capacity = config.queue_capacity.max(1);
        Self {
            config: DispatcherConfig {
                queue_capacity: capacity,
                ..config
            },
            clock,
            busy: false,
            queue: VecDeque::with_capacity(capacity),
            last_admitted: None,
        }
    }

    /// Offers a raw request value read from the request slot.
    ///
    /// The cooldown window runs from the previous *admission* (start or
    /// queue), not from the previous completion.
    pub fn admit(&mut self, raw: &str) -> Admission {
        if raw.is_empty() || raw == SENTINEL {
            return Admission::Ignored;
        }

        let now = self.clock.current_millis();
        let cooldown = self.config.cooldown.as_millis() as u64;
        if self
            .last_admitted
            .is_some_and(|last| now.saturating_sub(last) < cooldown)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("request rejected by cooldown");
            return Admission::Cooldown;
        }
        self.last_admitted = Some(now);

        if !self.busy {
            self.busy = true;
            return Admission::Start(raw.to_owned());
        }

        let evicted = if self.queue.len() >= self.config.queue_capacity {
            self.queue.pop_front()
        } else {
            None
        };
        #[cfg(feature = "tracing")]
        if evicted.is_some() {
            tracing::warn!(
                capacity = self.config.queue_capacity,
                "request queue full, dropped oldest"
            );
        }
        self.queue.push_back(raw.to_owned());
        Admission::Queued { evicted }
    }

    /// Marks the in-flight request finished.
    ///
    /// Returns the delay after which [`Dispatcher::drain_next`] should be
    /// called, or `None` when nothing is waiting.
    pub fn complete(&mut self) -> Option<Duration> {
        self.busy = false;
        self.has_pending().then_some(self.config.drain_delay)
    }

    /// Takes the oldest queued request and marks it in flight.
    ///
    /// A no-op while busy or when the queue is empty. Queued requests were
    /// already admitted, so the cooldown does not apply here.
    pub fn drain_next(&mut self) -> Option<String> {
        if self.busy {
            return None;
        }
        let next = self.queue.pop_front()?;
        self.busy = true;
        Some(next)
    }

    /// Forgets the in-flight request without completing it. Queued requests
    /// are kept.
    pub fn abandon(&mut self) {
        self.busy = false;
    }

    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub const fn clock(&self) -> &T {
        &self.clock
    }
}
