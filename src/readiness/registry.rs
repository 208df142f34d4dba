use crate::foundation::clock::Clock;
use crate::foundation::core::HandleId;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::readiness::timer::TimerWheel;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Handle budget used when the page environment does not override it.
pub const DEFAULT_HANDLE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Settlements remembered for duplicate diagnostics. Older ones report "already settled".
const SETTLED_HISTORY: usize = 256;

/// One outstanding blocker registered through `delay_render`.
#[derive(Clone, Debug)]
struct PendingHandle {
    label: Option<String>,
    timeout: Duration,
}

/// Diagnostic snapshot of a pending handle.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingHandleInfo {
    /// Handle token.
    pub id: HandleId,
    /// Label supplied at registration, if any.
    pub label: Option<String>,
    /// Time left before the handle expires.
    pub remaining: Duration,
}

/// Terminal failure recorded for the current page instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderFailure {
    /// A handle was not continued before its deadline.
    Timeout {
        /// Expired handle.
        id: HandleId,
        /// Its diagnostic label.
        label: Option<String>,
        /// Budget it was given.
        timeout: Duration,
    },
    /// The page reported an unrecoverable error (`cancel_render`).
    Cancelled {
        /// Error description supplied by the page.
        message: String,
    },
}

impl RenderFailure {
    /// Convert into the error the driver surfaces.
    pub fn to_error(&self) -> BridgeError {
        match self {
            Self::Timeout { id, label, timeout } => BridgeError::HandleTimeout {
                id: *id,
                label: label.clone(),
                timeout: *timeout,
            },
            Self::Cancelled { message } => BridgeError::Cancelled(message.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Settlement {
    Continued,
    Cancelled,
    TimedOut,
}

impl Settlement {
    fn describe(self) -> &'static str {
        match self {
            Self::Continued => "already continued",
            Self::Cancelled => "already cancelled",
            Self::TimedOut => "already timed out",
        }
    }
}

/// Bounded record of recent settlements, oldest first.
#[derive(Debug, Default)]
struct SettledLog {
    recent: VecDeque<(HandleId, Settlement)>,
}

impl SettledLog {
    fn push(&mut self, id: HandleId, how: Settlement) {
        if self.recent.len() == SETTLED_HISTORY {
            self.recent.pop_front();
        }
        self.recent.push_back((id, how));
    }

    fn get(&self, id: HandleId) -> Option<Settlement> {
        self.recent
            .iter()
            .rev()
            .find(|(settled, _)| *settled == id)
            .map(|&(_, how)| how)
    }

    fn len(&self) -> usize {
        self.recent.len()
    }

    fn clear(&mut self) {
        self.recent.clear();
    }
}

/// Result of continuing or cancelling a handle.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The handle was pending and is now cleared.
    Resolved {
        /// Readiness after this resolution.
        now_ready: bool,
    },
    /// Duplicate or unknown id; state is unchanged.
    Ignored {
        /// Why the call had no effect.
        reason: String,
    },
}

/// Page-wide set of outstanding async blockers plus the terminal error slot.
///
/// Readiness holds exactly when no handle is pending and no failure is recorded. Deadlines are
/// tracked in a cooperative timer wheel and only fire when [`ReadinessRegistry::poll_timeouts`]
/// runs.
pub struct ReadinessRegistry {
    clock: Arc<dyn Clock>,
    default_timeout: Duration,
    pending: HashMap<HandleId, PendingHandle>,
    settled: SettledLog,
    timers: TimerWheel,
    next_id: u64,
    epoch_start: u64,
    last_error: Option<RenderFailure>,
}

impl std::fmt::Debug for ReadinessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessRegistry")
            .field("default_timeout", &self.default_timeout)
            .field("pending", &self.pending.len())
            .field("armed", &self.timers.len())
            .field("settled", &self.settled.len())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl ReadinessRegistry {
    /// Create an empty registry reading deadlines from `clock`.
    pub fn new(clock: Arc<dyn Clock>, default_timeout: Duration) -> Self {
        Self {
            clock,
            default_timeout,
            pending: HashMap::new(),
            settled: SettledLog::default(),
            timers: TimerWheel::new(),
            next_id: 0,
            epoch_start: 0,
            last_error: None,
        }
    }

    /// Budget applied to registrations without an explicit timeout.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a blocker using the default timeout.
    pub fn register(&mut self, label: Option<&str>) -> HandleId {
        self.register_with_timeout(label, None)
    }

    /// Register a blocker with an optional per-handle timeout override.
    pub fn register_with_timeout(
        &mut self,
        label: Option<&str>,
        timeout: Option<Duration>,
    ) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;

        let timeout = timeout.unwrap_or(self.default_timeout);
        let deadline = self.clock.now().saturating_add(timeout);
        self.timers.schedule(id, deadline);
        self.pending.insert(
            id,
            PendingHandle {
                label: label.map(str::to_owned),
                timeout,
            },
        );
        tracing::debug!(
            %id,
            label = ?label,
            timeout_ms = timeout.as_millis() as u64,
            "delay render"
        );
        id
    }

    /// Clear a pending handle (`continue_render`).
    pub fn resolve(&mut self, id: HandleId) -> ResolveOutcome {
        self.settle(id, Settlement::Continued)
    }

    /// Clear a pending handle because the page is going away. Same readiness effect as
    /// [`ReadinessRegistry::resolve`].
    pub fn cancel(&mut self, id: HandleId) -> ResolveOutcome {
        self.settle(id, Settlement::Cancelled)
    }

    fn settle(&mut self, id: HandleId, how: Settlement) -> ResolveOutcome {
        let Some(handle) = self.pending.remove(&id) else {
            let reason = match self.settled.get(id) {
                Some(prev) => prev.describe(),
                None if (self.epoch_start..self.next_id).contains(&id.0) => "already settled",
                None => "unknown handle",
            }
            .to_owned();
            let diag = BridgeError::DuplicateResolution {
                id,
                reason: reason.clone(),
            };
            tracing::warn!("{diag}");
            return ResolveOutcome::Ignored { reason };
        };

        self.timers.defuse(id);
        self.settled.push(id, how);
        let now_ready = self.is_ready();
        match how {
            Settlement::Cancelled => {
                tracing::debug!(%id, label = ?handle.label, "handle cancelled")
            }
            _ => tracing::debug!(%id, label = ?handle.label, now_ready, "continue render"),
        }
        ResolveOutcome::Resolved { now_ready }
    }

    /// Cancel every pending handle at once (page teardown). Returns how many were cleared.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        for (id, _) in self.pending.drain() {
            self.settled.push(id, Settlement::Cancelled);
        }
        self.timers.clear();
        if n > 0 {
            tracing::debug!(cancelled = n, "cancelled all pending handles");
        }
        n
    }

    /// Record an unrecoverable page error. The first recorded failure wins.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(%message, "render cancelled");
        if self.last_error.is_none() {
            self.last_error = Some(RenderFailure::Cancelled { message });
        }
    }

    /// Fire every deadline that has elapsed. Returns the number of handles that expired.
    pub fn poll_timeouts(&mut self) -> usize {
        let now = self.clock.now();
        let expired = self.timers.expired(now);
        for &id in &expired {
            let Some(handle) = self.pending.remove(&id) else {
                continue;
            };
            self.settled.push(id, Settlement::TimedOut);
            let failure = RenderFailure::Timeout {
                id,
                label: handle.label,
                timeout: handle.timeout,
            };
            tracing::error!("{}", failure.to_error());
            if self.last_error.is_none() {
                self.last_error = Some(failure);
            }
        }
        expired.len()
    }

    /// Pure readiness predicate: nothing pending and no failure recorded.
    pub fn is_ready(&self) -> bool {
        self.pending.is_empty() && self.last_error.is_none()
    }

    /// Recorded terminal failure, if any.
    pub fn last_error(&self) -> Option<&RenderFailure> {
        self.last_error.as_ref()
    }

    /// `Err` carrying the recorded failure, `Ok` otherwise.
    pub fn check(&self) -> BridgeResult<()> {
        match &self.last_error {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }

    /// Number of pending handles.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `id` is still waiting to be continued.
    pub fn is_pending(&self, id: HandleId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Id the next registration will receive. Handles registered after this call compare `>=`.
    pub fn next_handle_id(&self) -> HandleId {
        HandleId(self.next_id)
    }

    /// Pending handles registered at or after `mark`, ordered by id.
    pub fn pending_since(&self, mark: HandleId) -> Vec<HandleId> {
        let mut ids: Vec<_> = self.pending.keys().copied().filter(|id| *id >= mark).collect();
        ids.sort_unstable();
        ids
    }

    /// Earliest armed deadline, as a clock reading.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Snapshot of pending handles ordered by id.
    pub fn pending(&self) -> Vec<PendingHandleInfo> {
        let now = self.clock.now();
        let mut out: Vec<_> = self
            .pending
            .iter()
            .map(|(&id, h)| PendingHandleInfo {
                id,
                label: h.label.clone(),
                remaining: self
                    .timers
                    .deadline_of(id)
                    .map(|d| d.saturating_sub(now))
                    .unwrap_or_default(),
            })
            .collect();
        out.sort_by_key(|h| h.id);
        out
    }

    /// Start a fresh attempt: drop pending handles, timers, history and the recorded failure.
    ///
    /// Ids keep increasing so a stale id from before the reset stays unknown.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.settled.clear();
        self.timers.clear();
        self.last_error = None;
        self.epoch_start = self.next_id;
        tracing::debug!("readiness registry reset");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/readiness/registry.rs"]
mod tests;
