//! # Download Handle
//!
//! A [`DownloadHandle`] represents one volume fetch that may still be in
//! progress. The backend hands it out at initiation time and settles it from
//! a background task; the coordinator caches it and forwards clones to every
//! consumer that needs the same volume.
//!
//! ## Overview
//!
//! The handle is a tagged state machine guarded by one mutex per handle:
//!
//! ```text
//!             complete(payload)         release()
//!   Pending ──────────────────> Ready ─────────────> Released
//!      │ \                                              ^  ^
//!      │  \ fail(reason)                   release()    │  │
//!      │   '──────────────────> Failed ─────────────────'  │
//!      │                                                   │
//!      '───────────────────────────────────────────────────'
//!                           release()
//! ```
//!
//! `wait` may be called any number of times by any number of tasks; every
//! waiter receives the payload (a cheap [`Bytes`] clone of one shared
//! buffer), so waiting never double-consumes it. `release` is valid from
//! every phase except `Released` and succeeds exactly once; a release while
//! the transfer is still running causes the late payload to be dropped when
//! the backend task finally settles.
//!
//! ## Usage
//!
//! ```rust
//! use backend_traits::DownloadHandle;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> backend_traits::Result<()> {
//! let handle = DownloadHandle::pending("vault-b0001.zvol");
//!
//! let writer = handle.clone();
//! tokio::spawn(async move {
//!     writer.complete(Bytes::from_static(b"volume bytes")).await;
//! });
//!
//! let payload = handle.wait().await?;
//! assert_eq!(&payload[..], b"volume bytes");
//! handle.release().await?;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::{BackendError, Result};

// ============================================================================
// Phase
// ============================================================================

/// Externally observable phase of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePhase {
    /// Transfer initiated, payload not yet available.
    Pending,
    /// Payload available; `wait` returns immediately.
    Ready,
    /// Resources released; the payload is gone.
    Released,
    /// Transfer failed; `wait` returns the failure.
    Failed,
}

impl HandlePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlePhase::Pending => "pending",
            HandlePhase::Ready => "ready",
            HandlePhase::Released => "released",
            HandlePhase::Failed => "failed",
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

enum HandleState {
    Pending,
    Ready(Bytes),
    Released,
    Failed(String),
}

impl HandleState {
    fn phase(&self) -> HandlePhase {
        match self {
            HandleState::Pending => HandlePhase::Pending,
            HandleState::Ready(_) => HandlePhase::Ready,
            HandleState::Released => HandlePhase::Released,
            HandleState::Failed(_) => HandlePhase::Failed,
        }
    }
}

struct HandleInner {
    name: String,
    state: Mutex<HandleState>,
    ready: Notify,
}

/// Shared, waitable, releasable representation of one volume fetch.
///
/// Cloning is cheap (one `Arc` bump); all clones observe the same state.
#[derive(Clone)]
pub struct DownloadHandle {
    inner: Arc<HandleInner>,
}

impl DownloadHandle {
    /// Create a handle for a transfer that has just been initiated.
    pub fn pending(name: impl Into<String>) -> Self {
        Self::with_state(name, HandleState::Pending)
    }

    /// Create a handle that is already settled with a payload.
    ///
    /// Useful for backends that can answer synchronously and for tests.
    pub fn ready(name: impl Into<String>, payload: Bytes) -> Self {
        Self::with_state(name, HandleState::Ready(payload))
    }

    fn with_state(name: impl Into<String>, state: HandleState) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name: name.into(),
                state: Mutex::new(state),
                ready: Notify::new(),
            }),
        }
    }

    /// Remote object name this handle is fetching. Diagnostic only.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current phase snapshot.
    pub async fn phase(&self) -> HandlePhase {
        self.inner.state.lock().await.phase()
    }

    /// Whether two handles share the same underlying download.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Suspend until the transfer settles, then yield the payload.
    ///
    /// Safe to call repeatedly and from multiple tasks; every caller gets a
    /// clone of the same buffer. Returns `DownloadFailed` if the transfer
    /// failed and `HandleReleased` if the handle was released first.
    pub async fn wait(&self) -> Result<Bytes> {
        loop {
            // Register interest before inspecting state so a transition
            // between the check and the await cannot be missed.
            let notified = self.inner.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock().await;
                match &*state {
                    HandleState::Pending => {}
                    HandleState::Ready(payload) => return Ok(payload.clone()),
                    HandleState::Released => return Err(BackendError::HandleReleased),
                    HandleState::Failed(reason) => {
                        return Err(BackendError::DownloadFailed(reason.clone()))
                    }
                }
            }

            notified.as_mut().await;
        }
    }

    /// Release the resources held by this handle.
    ///
    /// Valid from `Pending`, `Ready`, or `Failed`; errs with
    /// `HandleReleased` on a second call. Waiters still parked in [`wait`]
    /// are woken and observe the released state.
    ///
    /// [`wait`]: DownloadHandle::wait
    pub async fn release(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            if matches!(*state, HandleState::Released) {
                return Err(BackendError::HandleReleased);
            }
            *state = HandleState::Released;
        }
        self.inner.ready.notify_waiters();
        Ok(())
    }

    /// Settle the handle with the fetched payload. Backend side.
    ///
    /// A payload arriving after the handle was released (or failed) is
    /// dropped; the transfer outcome no longer matters to anyone.
    pub async fn complete(&self, payload: Bytes) {
        {
            let mut state = self.inner.state.lock().await;
            match *state {
                HandleState::Pending => *state = HandleState::Ready(payload),
                _ => {
                    debug!(
                        name = %self.inner.name,
                        phase = state.phase().as_str(),
                        "discarding payload for settled handle"
                    );
                    return;
                }
            }
        }
        self.inner.ready.notify_waiters();
    }

    /// Settle the handle with a transfer failure. Backend side.
    pub async fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        {
            let mut state = self.inner.state.lock().await;
            match *state {
                HandleState::Pending => *state = HandleState::Failed(reason),
                _ => {
                    debug!(
                        name = %self.inner.name,
                        %reason,
                        "ignoring failure for settled handle"
                    );
                    return;
                }
            }
        }
        self.inner.ready.notify_waiters();
    }
}

impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("name", &self.inner.name)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
