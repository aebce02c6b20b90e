//! Configuration ingest for first-boot provisioning.
//!
//! While the device is an access point, the HTTP endpoint hands every
//! request to a [`ConfigurationIngestService`] clone.  The boot task blocks
//! in [`ConfigurationIngestService::await_submission`] until one valid
//! submission has been accepted or the wait times out.  A timed-out wait
//! closes the service, so a late submission is refused rather than
//! acknowledged and lost in the restart.
//!
//! ```text
//!   POST /api/config ──▶ parse_payload ──▶ IngestState.received = true
//!                                              │ notify
//!   boot task ◀── await_submission ◀── Condvar ┘
//! ```

pub mod payload;

use core::fmt;
use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{info, warn};
use serde_json::json;

use crate::config::DeviceConfig;
pub use payload::{MAX_CONFIG_BODY, ValidationError, parse_payload};

/// Status code and JSON body for one endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn success() -> Self {
        Self {
            status: 200,
            body: json!({"status": "success"}).to_string(),
        }
    }

    pub fn rejected(err: &ValidationError) -> Self {
        Self {
            status: err.status(),
            body: json!({"status": "error", "message": err.message()}).to_string(),
        }
    }
}

/// No submission arrived in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    pub waited: Duration,
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no configuration received within {}s", self.waited.as_secs())
    }
}

#[derive(Debug, Default)]
struct IngestState {
    config: DeviceConfig,
    received: bool,
    closed: bool,
}

/// Shared slot between the HTTP handlers and the boot task.
#[derive(Clone, Default)]
pub struct ConfigurationIngestService {
    shared: Arc<(Mutex<IngestState>, Condvar)>,
}

impl ConfigurationIngestService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, IngestState> {
        self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_received(&self) -> bool {
        self.state().received
    }

    /// `GET /api/check`
    pub fn handle_check(&self) -> HttpReply {
        HttpReply::success()
    }

    /// `POST /api/config`
    pub fn handle_config(&self, body: &[u8]) -> HttpReply {
        match self.ingest(body) {
            Ok(()) => HttpReply::success(),
            Err(e) => {
                warn!("Provisioning: submission rejected: {}", e);
                HttpReply::rejected(&e)
            }
        }
    }

    fn ingest(&self, body: &[u8]) -> Result<(), ValidationError> {
        Self::admit(&self.state())?;
        let submitted = parse_payload(body)?;

        let mut state = self.state();
        // The state may have moved on while this request was parsing.
        Self::admit(&state)?;
        state.config = submitted;
        state.received = true;
        info!("Provisioning: configuration accepted ({})", state.config);
        drop(state);
        self.shared.1.notify_all();
        Ok(())
    }

    fn admit(state: &IngestState) -> Result<(), ValidationError> {
        if state.received {
            Err(ValidationError::AlreadyReceived)
        } else if state.closed {
            Err(ValidationError::WindowClosed)
        } else {
            Ok(())
        }
    }

    /// Block until a submission is accepted.
    ///
    /// On timeout the service closes and refuses every later submission.
    ///
    /// `timeout = None` waits forever.  A progress line is logged every
    /// `log_interval`.
    pub fn await_submission(
        &self,
        timeout: Option<Duration>,
        log_interval: Duration,
    ) -> Result<DeviceConfig, WaitTimeout> {
        let started = Instant::now();
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);

        while !state.received {
            let waited = started.elapsed();
            let slice = match timeout {
                Some(limit) if waited >= limit => {
                    state.closed = true;
                    return Err(WaitTimeout { waited });
                }
                Some(limit) => log_interval.min(limit - waited),
                None => log_interval,
            };
            let (next, result) = cvar
                .wait_timeout_while(state, slice, |s| !s.received)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
            if result.timed_out() {
                info!(
                    "Provisioning: waiting for configuration ({}s elapsed)",
                    started.elapsed().as_secs()
                );
            }
        }
        Ok(state.config.clone())
    }
}
