//! # Event Bus System
//!
//! Provides an event-driven architecture for the restore engine using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between pipeline stages and their observers through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Downloader   ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │ Pipeline     ├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! │ owner        │               │           │                  └────────────┘
//! └──────────────┘               │           │     subscribe    ┌────────────┐
//!                                │           ├─────────────────>│ Subscriber │
//!                                └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Creating an Event Bus
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! let event_bus = EventBus::new(100); // Buffer size of 100 events
//! ```
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent, RestoreEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = EngineEvent::Restore(RestoreEvent::DownloadStarted {
//!     operation: "op-123".to_string(),
//!     volume_id: 7,
//!     name: "vault-b0007.zvol".to_string(),
//!     size: 52_428_800,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types
//! of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. Shutdown signal.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events. Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Engine Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types per pipeline concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// Volume download / eviction events from the restore stage
    Restore(RestoreEvent),
    /// Lifecycle events for a whole restore operation
    Operation(OperationEvent),
}

impl EngineEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            EngineEvent::Restore(e) => e.description(),
            EngineEvent::Operation(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            EngineEvent::Restore(RestoreEvent::VolumeFailed { .. }) => EventSeverity::Error,
            EngineEvent::Operation(OperationEvent::Failed { .. }) => EventSeverity::Error,
            EngineEvent::Restore(RestoreEvent::Retired {
                leftover_volumes, ..
            }) if *leftover_volumes > 0 => EventSeverity::Warning,
            EngineEvent::Restore(RestoreEvent::Retired { .. }) => EventSeverity::Info,
            EngineEvent::Operation(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Restore Events
// ============================================================================

/// Events emitted by the volume downloader while a restore runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RestoreEvent {
    /// A backend fetch was initiated for a volume not in the cache.
    DownloadStarted {
        /// The restore operation this download belongs to.
        operation: String,
        /// The volume being fetched.
        volume_id: i64,
        /// Remote object name.
        name: String,
        /// Remote object size in bytes.
        size: i64,
    },
    /// A cached volume was evicted and its handle released.
    VolumeEvicted {
        /// The restore operation.
        operation: String,
        /// The volume that was evicted.
        volume_id: i64,
    },
    /// Metadata lookup or fetch initiation failed for a volume.
    VolumeFailed {
        /// The restore operation.
        operation: String,
        /// The volume that could not be retrieved.
        volume_id: i64,
        /// Human-readable failure message.
        message: String,
    },
    /// The downloader retired (input channel closed or fault).
    Retired {
        /// The restore operation.
        operation: String,
        /// Requests processed over the downloader's lifetime.
        requests_processed: u64,
        /// Volumes still cached at retirement; non-zero signals a
        /// lifecycle violation upstream (handles that were never evicted).
        leftover_volumes: u64,
    },
}

impl RestoreEvent {
    fn description(&self) -> &str {
        match self {
            RestoreEvent::DownloadStarted { .. } => "Volume download started",
            RestoreEvent::VolumeEvicted { .. } => "Volume evicted from cache",
            RestoreEvent::VolumeFailed { .. } => "Volume could not be retrieved",
            RestoreEvent::Retired { .. } => "Volume downloader retired",
        }
    }
}

// ============================================================================
// Operation Events
// ============================================================================

/// Lifecycle events for a whole restore operation, emitted by whoever owns
/// the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum OperationEvent {
    /// Restore operation started.
    Started {
        /// Unique identifier for this operation.
        operation: String,
    },
    /// Restore operation finished.
    Completed {
        /// The operation id.
        operation: String,
        /// Number of volumes recorded in the failure set.
        failed_volumes: u64,
    },
    /// Restore operation aborted with an error.
    Failed {
        /// The operation id.
        operation: String,
        /// Human-readable error message.
        message: String,
    },
}

impl OperationEvent {
    fn description(&self) -> &str {
        match self {
            OperationEvent::Started { .. } => "Restore operation started",
            OperationEvent::Completed { .. } => "Restore operation completed",
            OperationEvent::Failed { .. } => "Restore operation failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EngineEvent, OperationEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut subscriber = event_bus.subscribe();
///
/// // Emit an event
/// let event = EngineEvent::Operation(OperationEvent::Started {
///     operation: "op-123".to_string(),
/// });
/// event_bus.emit(event).ok();
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: EngineEvent) -> Result<usize, SendError<EngineEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&EngineEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, EngineEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for restore-stage events only
/// let mut restore_stream = stream.filter(|event| {
///     matches!(event, EngineEvent::Restore(_))
/// });
/// # }
/// ```
pub struct EventStream {
    receiver: Receiver<EngineEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<EngineEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EngineEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<EngineEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<EngineEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
