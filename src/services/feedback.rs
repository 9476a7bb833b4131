//! Per-view bookkeeping shared by the resource controllers: the in-flight
//! flag, the transient error banner and the mount liveness check.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::{AppError, Result};

#[derive(Default)]
pub struct InFlight {
    count: AtomicUsize,
}

impl InFlight {
    pub fn begin(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { in_flight: self }
    }

    pub fn is_active(&self) -> bool {
        self.count.load(Ordering::SeqCst) > 0
    }
}

pub struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.count.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Shown {
    message: String,
    expires_at: Option<Instant>,
}

/// An error message that is displayed until a fixed window after the
/// operation that produced (or followed) it settles.
pub struct TransientError {
    window: Duration,
    slot: Mutex<Option<Shown>>,
}

impl TransientError {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Mutex::new(None),
        }
    }

    pub fn show(&self, message: impl Into<String>) {
        *self.slot.lock() = Some(Shown {
            message: message.into(),
            expires_at: None,
        });
    }

    /// Starts the display window for whatever is currently shown.
    pub fn schedule_clear(&self) {
        if let Some(shown) = self.slot.lock().as_mut() {
            shown.expires_at = Some(Instant::now() + self.window);
        }
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn current(&self) -> Option<String> {
        let mut slot = self.slot.lock();

        let expired = matches!(
            slot.as_ref(),
            Some(Shown { expires_at: Some(at), .. }) if Instant::now() >= *at
        );
        if expired {
            *slot = None;
        }

        slot.as_ref().map(|shown| shown.message.clone())
    }
}

#[derive(Clone)]
pub struct LivenessToken {
    alive: Arc<AtomicBool>,
}

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Tracks whether the view owning a controller is still mounted. Each call
/// captures a token when dispatched; unmounting kills every outstanding token.
pub struct Liveness {
    current: Mutex<Arc<AtomicBool>>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            current: Mutex::new(Arc::new(AtomicBool::new(true))),
        }
    }
}

impl Liveness {
    pub fn token(&self) -> LivenessToken {
        LivenessToken {
            alive: self.current.lock().clone(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.current.lock().load(Ordering::SeqCst)
    }

    pub fn mount(&self) {
        let mut current = self.current.lock();
        if !current.load(Ordering::SeqCst) {
            *current = Arc::new(AtomicBool::new(true));
        }
    }

    pub fn unmount(&self) {
        self.current.lock().store(false, Ordering::SeqCst);
    }
}

pub struct ViewFeedback {
    in_flight: InFlight,
    error: TransientError,
    liveness: Liveness,
}

impl ViewFeedback {
    pub fn new(error_window: Duration) -> Self {
        Self {
            in_flight: InFlight::default(),
            error: TransientError::new(error_window),
            liveness: Liveness::default(),
        }
    }

    /// Marks the start of a round trip.
    pub fn begin(&self) -> Ticket<'_> {
        Ticket {
            _guard: self.in_flight.begin(),
            token: self.liveness.token(),
            feedback: self,
        }
    }

    /// Surfaces an error found before any round trip.
    pub fn reject<T>(&self, error: AppError) -> Result<T> {
        if self.liveness.is_mounted() {
            self.error.show(error.to_string());
            self.error.schedule_clear();
        }
        Err(error)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_active()
    }

    pub fn error(&self) -> Option<String> {
        self.error.current()
    }

    pub fn clear_error(&self) {
        self.error.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.liveness.is_mounted()
    }

    pub fn mount(&self) {
        self.liveness.mount();
    }

    pub fn unmount(&self) {
        self.liveness.unmount();
    }
}

/// One dispatched operation. Dropping it clears its share of the in-flight flag.
pub struct Ticket<'a> {
    _guard: InFlightGuard<'a>,
    token: LivenessToken,
    feedback: &'a ViewFeedback,
}

impl Ticket<'_> {
    pub fn is_live(&self) -> bool {
        self.token.is_alive()
    }

    /// Records the outcome in the error banner and starts its display window.
    /// Outcomes of calls whose view has gone away are passed through untouched.
    pub fn settle<T>(self, outcome: Result<T>) -> Result<T> {
        if !self.is_live() {
            tracing::debug!("View unmounted before response, discarding");
            return outcome;
        }

        if let Err(e) = &outcome {
            self.feedback.error.show(e.to_string());
        }
        self.feedback.error.schedule_clear();

        outcome
    }
}
