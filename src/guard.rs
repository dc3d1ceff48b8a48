//! Per-name call guard for remote function invocations.
//!
//! A call is refused when the previous accepted call under the same name
//! started less than `window` ago (`Throttled`), or when that call has not
//! finished yet (`InFlight`). The window check always runs first.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics::{GUARD_ACCEPTED, GUARD_IN_FLIGHT, GUARD_THROTTLED};

/// Why the guard refused a call. The wrapped operation was not started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("'{name}' was called too recently, retry in {retry_after:?}")]
    Throttled { name: String, retry_after: Duration },

    #[error("'{name}' is already in flight")]
    InFlight { name: String },

    #[error("operation name must not be empty")]
    EmptyName,
}

// Call record - tracks the last accepted call per operation name
#[derive(Debug, Clone)]
struct CallRecord {
    last_call_at: Instant,
    in_flight: bool,
}

pub struct CallGuard {
    records: DashMap<String, CallRecord>,
    default_window: Duration,
}

impl CallGuard {
    pub fn new(default_window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            default_window,
        }
    }

    pub fn default_window(&self) -> Duration {
        self.default_window
    }

    /// Run `invoker` under `name` using the default window.
    pub async fn call<T, E, F, Fut>(&self, name: &str, invoker: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Rejection>,
    {
        self.attempt(name, self.default_window, invoker).await
    }

    /// Run `invoker` under `name` unless the guard refuses it.
    ///
    /// Errors produced by `invoker` are returned as they are; only the
    /// guard's own refusals go through `E::from(Rejection)`. The in-flight
    /// mark is cleared when this future finishes or is dropped.
    pub async fn attempt<T, E, F, Fut>(
        &self,
        name: &str,
        window: Duration,
        invoker: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Rejection>,
    {
        let _in_flight = self.acquire(name, window)?;
        invoker().await
    }

    fn acquire(&self, name: &str, window: Duration) -> Result<InFlight<'_>, Rejection> {
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let now = Instant::now();

        // entry() holds the shard lock, so check-and-mark is atomic per name
        match self.records.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let elapsed = now.saturating_duration_since(record.last_call_at);

                if elapsed < window {
                    GUARD_THROTTLED.inc();
                    let retry_after = window - elapsed;
                    warn!(name, ?retry_after, "call throttled");
                    return Err(Rejection::Throttled {
                        name: name.to_string(),
                        retry_after,
                    });
                }

                if record.in_flight {
                    GUARD_IN_FLIGHT.inc();
                    warn!(name, "call rejected, previous call still in flight");
                    return Err(Rejection::InFlight {
                        name: name.to_string(),
                    });
                }

                record.in_flight = true;
                record.last_call_at = now;
            }
            Entry::Vacant(entry) => {
                entry.insert(CallRecord {
                    last_call_at: now,
                    in_flight: true,
                });
            }
        }

        GUARD_ACCEPTED.inc();
        debug!(name, ?window, "call accepted");
        Ok(InFlight {
            guard: self,
            name: name.to_string(),
        })
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.records
            .get(name)
            .map(|record| record.in_flight)
            .unwrap_or(false)
    }

    /// Number of names with a record.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Forget idle names whose last accepted call is older than `max_age`.
    /// Returns how many records were removed.
    pub fn prune_idle(&self, max_age: Duration) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| record.in_flight || record.last_call_at.elapsed() < max_age);
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, "pruned idle call records");
        }
        removed
    }
}

impl Default for CallGuard {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

// Clears the in-flight mark on every exit path
struct InFlight<'a> {
    guard: &'a CallGuard,
    name: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut record) = self.guard.records.get_mut(&self.name) {
            record.in_flight = false;
        }
    }
}
