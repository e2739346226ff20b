//! Connection identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Identify each client session for tracing
//! - Count live connection handlers and those with an exchange in flight
//! - Keep the handler gauges in step with the counts

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::observability::metrics;

/// Unique identifier for a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0.simple())
    }
}

/// Client-facing and target-facing sockets of one session.
///
/// Both are owned by a single connection handler and closed together.
#[derive(Debug)]
pub struct ConnectionPair<S, T> {
    pub source: S,
    pub target: T,
}

impl<S, T> ConnectionPair<S, T> {
    pub fn new(source: S, target: T) -> Self {
        Self { source, target }
    }
}

/// Shared counters for live connection handlers.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    busy: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new handler. The returned guard releases it on drop.
    pub fn track(&self) -> ConnectionGuard {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_handlers(active);
        ConnectionGuard {
            id: ConnectionId::new(),
            tracker: self.clone(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Handlers currently between a request start and its response end.
    pub fn busy_count(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Ties one connection handler to its tracker.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    tracker: ConnectionTracker,
    busy: AtomicBool,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Mark an exchange as in flight. Idempotent.
    pub fn mark_busy(&self) {
        if !self.busy.swap(true, Ordering::SeqCst) {
            let busy = self.tracker.busy.fetch_add(1, Ordering::SeqCst) + 1;
            metrics::set_busy_handlers(busy);
        }
    }

    /// Mark the in-flight exchange as complete. Idempotent.
    pub fn mark_idle(&self) {
        if self.busy.swap(false, Ordering::SeqCst) {
            let busy = self.tracker.busy.fetch_sub(1, Ordering::SeqCst) - 1;
            metrics::set_busy_handlers(busy);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.mark_idle();
        let active = self.tracker.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_handlers(active);
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}
