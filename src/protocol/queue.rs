//! Single-slot request queue with coalescing.
//!
//! ```text
//! Idle ──submit──▶ InFlight ──submit──▶ InFlightWithFollowup
//!   ▲                 │  ▲                    │ submit: replace pending
//!   └──complete───────┘  └──complete: dispatch pending
//! ```
//!
//! At most one request is in flight and at most one waits behind it; a
//! newer submission replaces the waiting one (last writer wins). Every
//! dispatch gets a fresh generation number, and only the response of the
//! newest generation is ever applied.

/// A request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch<T> {
    pub generation: u64,
    pub request: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueState<T> {
    Idle,
    InFlight {
        generation: u64,
    },
    InFlightWithFollowup {
        generation: u64,
        pending: T,
    },
}

impl<T> Default for QueueState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

/// What to do with a response that just arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<T> {
    /// `true` when the response belongs to the newest request and should be
    /// applied.
    pub apply: bool,
    /// The coalesced follow-up to send now, if any.
    pub next: Option<Dispatch<T>>,
}

#[derive(Debug, Clone)]
pub struct RequestQueue<T> {
    state: QueueState<T>,
    next_generation: u64,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: QueueState::Idle,
            next_generation: 1,
        }
    }

    #[must_use]
    pub fn state(&self) -> &QueueState<T> {
        &self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, QueueState::Idle)
    }

    /// Generation of the request currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Option<u64> {
        match self.state {
            QueueState::Idle => None,
            QueueState::InFlight { generation } | QueueState::InFlightWithFollowup { generation, .. } => {
                Some(generation)
            }
        }
    }

    /// Queues a request. Returns it back with a generation if it may be sent
    /// immediately; otherwise it becomes the pending follow-up.
    pub fn submit(&mut self, request: T) -> Option<Dispatch<T>> {
        match std::mem::take(&mut self.state) {
            QueueState::Idle => Some(self.dispatch(request)),
            QueueState::InFlight { generation } => {
                log::debug!("Request {generation} in flight; queueing follow-up");
                self.state = QueueState::InFlightWithFollowup {
                    generation,
                    pending: request,
                };
                None
            }
            QueueState::InFlightWithFollowup { generation, .. } => {
                log::debug!("Replacing pending follow-up behind request {generation}");
                self.state = QueueState::InFlightWithFollowup {
                    generation,
                    pending: request,
                };
                None
            }
        }
    }

    /// Records the arrival of the response for `generation`.
    ///
    /// Responses for anything but the in-flight generation are stale. A
    /// response whose request already has a follow-up queued is superseded:
    /// it is not applied and the follow-up is dispatched instead.
    pub fn complete(&mut self, generation: u64) -> Completion<T> {
        if self.in_flight() != Some(generation) {
            log::debug!("Discarding stale response {generation}");
            return Completion { apply: false, next: None };
        }
        match std::mem::take(&mut self.state) {
            QueueState::InFlightWithFollowup { pending, .. } => Completion {
                apply: false,
                next: Some(self.dispatch(pending)),
            },
            _ => Completion { apply: true, next: None },
        }
    }

    /// Forgets every in-flight and pending request; their responses will be
    /// treated as stale.
    pub fn reset(&mut self) {
        self.state = QueueState::Idle;
    }

    fn dispatch(&mut self, request: T) -> Dispatch<T> {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.state = QueueState::InFlight { generation };
        Dispatch { generation, request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_last_writer_wins() {
        let mut q = RequestQueue::new();
        let first = q.submit("a").unwrap();
        assert!(q.submit("b").is_none());
        assert!(q.submit("c").is_none());

        let done = q.complete(first.generation);
        assert!(!done.apply);
        let next = done.next.unwrap();
        assert_eq!(next.request, "c");
        assert!(next.generation > first.generation);

        let done = q.complete(next.generation);
        assert!(done.apply);
        assert!(q.is_idle());
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut q = RequestQueue::new();
        let first = q.submit(1).unwrap();
        q.reset();
        let second = q.submit(2).unwrap();
        assert!(!q.complete(first.generation).apply);
        assert_eq!(q.in_flight(), Some(second.generation));
    }
}
