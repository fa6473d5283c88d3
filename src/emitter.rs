use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{EventKind, ToolEvent};

struct Listener {
    kinds: Vec<EventKind>,
    tx: Sender<ToolEvent>,
}

/// Fans [`ToolEvent`]s out to every subscription interested in their kind.
///
/// Clones share one listener list, so a clone handed out before a reporter
/// subscribes still reaches it. That is how parallel routines and the
/// tracing layer emit from their own threads.
///
/// ```rust,ignore
/// let emitter = Emitter::new();
/// let subscription = emitter.subscribe(&[EventKind::Log]);
/// emitter.clone().emit(ToolEvent::Log("hello".into()));
/// assert_eq!(subscription.try_next(), Some(ToolEvent::Log("hello".into())));
/// ```
#[derive(Clone, Default)]
pub struct Emitter {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.lock().iter().map(|l| l.kinds.clone()))
            .finish()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    // Listeners stay valid even if a sender panicked mid-emit.
    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers interest in `kinds` and returns the receiving end.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.lock().push(Listener {
            kinds: kinds.to_vec(),
            tx,
        });
        Subscription { rx }
    }

    pub fn listeners(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `event` to every interested subscription.
    ///
    /// Dropped subscriptions are pruned; a reporter going away never fails
    /// the work that emits to it.
    pub fn emit(&self, event: ToolEvent) {
        let kind = event.kind();
        self.lock().retain(|listener| {
            if !listener.kinds.contains(&kind) {
                return true;
            }
            let delivered = listener.tx.send(event.clone()).is_ok();
            if !delivered {
                tracing::trace!(event = kind.name(), "subscription closed, listener removed");
            }
            delivered
        });
    }
}

/// Why a subscription produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idle {
    /// Nothing arrived before the timeout.
    Timeout,
    /// No emitter can reach this subscription any more.
    Closed,
}

/// The receiving end of [`Emitter::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<ToolEvent>,
}

impl Subscription {
    /// Blocks until the next event, or until `timeout` elapses when given.
    pub fn next(&self, timeout: Option<Duration>) -> Result<ToolEvent, Idle> {
        match timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Idle::Timeout,
                RecvTimeoutError::Disconnected => Idle::Closed,
            }),
            None => self.rx.recv().map_err(|_| Idle::Closed),
        }
    }

    /// Returns an already-delivered event without blocking.
    pub fn try_next(&self) -> Option<ToolEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
