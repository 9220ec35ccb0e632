//! Admission-controlled dispatch queue
//!
//! Requests are queued in submission order and admitted while fewer than
//! [`MAX_CONCURRENCY`] are in flight. Every completion frees its slot, hands
//! the outcome to the caller, then admits whatever is waiting.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::normalize::{FetchError, RequestError};
use crate::selector::{select_transport, Capabilities, ConfigError};
use crate::transport::{Fetched, Transport, TransportConfig, TransportKind};

/// Maximum number of simultaneously in-flight requests
pub const MAX_CONCURRENCY: usize = 20;

/// Outcome delivered to a completion
pub type Outcome = Result<Fetched, FetchError>;

/// Caller-supplied completion, invoked exactly once
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// A submitted request that has not been dispatched yet
struct PendingRequest {
    url: String,
    completion: Completion,
}

/// Queue state, only ever touched under the lock
#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingRequest>,
    in_flight: usize,
}

struct Shared {
    state: Mutex<QueueState>,
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

/// Bounded-concurrency JSON GET dispatcher
///
/// Cloning is cheap; clones share one queue and one transport.
///
/// # Examples
/// ```no_run
/// use apiqueue::{Capabilities, Dispatcher, TransportConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher =
///     Dispatcher::from_capabilities(&Capabilities::default(), &TransportConfig::default())?;
/// let fetched = dispatcher.request("https://api.example.com/v2").await?;
/// println!("{} (ttl {:?})", fetched.body, fetched.ttl);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Creates a dispatcher around an already selected transport
    ///
    /// Must be called from within a tokio runtime, which then drives every
    /// request.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                transport,
                runtime,
            }),
        })
    }

    /// Selects a transport from `capabilities` and creates a dispatcher for it
    pub fn from_capabilities(
        capabilities: &Capabilities,
        config: &TransportConfig,
    ) -> Result<Self, ConfigError> {
        let transport = select_transport(capabilities, config)?;
        Self::new(transport)
    }

    /// Transport every request goes through
    pub fn transport_kind(&self) -> TransportKind {
        self.shared.transport.kind()
    }

    /// Number of requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of requests waiting for a slot
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Queues a GET for `url` and returns immediately
    ///
    /// `completion` runs exactly once on the runtime, never inside this call.
    pub fn submit<F>(&self, url: impl Into<String>, completion: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let url = url.into();
        {
            let mut state = self.lock();
            tracing::debug!(
                url = %url,
                in_flight = state.in_flight,
                pending = state.pending.len() + 1,
                "request queued"
            );
            state.pending.push_back(PendingRequest {
                url,
                completion: Box::new(completion),
            });
        }
        self.admit();
    }

    /// Queues a GET for `url` and returns a future resolving to its outcome
    ///
    /// The request is queued when this is called, not when the future is
    /// first polled, so call order is admission order.
    pub fn request(&self, url: impl Into<String>) -> impl Future<Output = Outcome> + Send + 'static {
        let url = url.into();
        let (tx, rx) = oneshot::channel();
        self.submit(url.clone(), move |outcome| {
            let _ = tx.send(outcome);
        });
        async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::new(RequestError::Abandoned { url })))
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves pending requests in flight until the queue is empty or full
    fn admit(&self) {
        let admitted: Vec<PendingRequest> = {
            let mut state = self.lock();
            let mut batch = Vec::new();
            while state.in_flight < MAX_CONCURRENCY {
                let Some(next) = state.pending.pop_front() else {
                    break;
                };
                state.in_flight += 1;
                tracing::debug!(
                    url = %next.url,
                    in_flight = state.in_flight,
                    pending = state.pending.len(),
                    "request admitted"
                );
                batch.push(next);
            }
            batch
        };

        for request in admitted {
            self.dispatch(request);
        }
    }

    fn dispatch(&self, request: PendingRequest) {
        let PendingRequest { url, completion } = request;
        let response = self.shared.transport.perform(url);
        let dispatcher = self.clone();

        self.shared.runtime.spawn(async move {
            let outcome = response.await;
            dispatcher.release();
            let _readmit = Readmit(&dispatcher);
            completion(outcome);
        });
    }

    fn release(&self) {
        let mut state = self.lock();
        debug_assert!(state.in_flight > 0, "released more slots than admitted");
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Runs admission when dropped, so a panicking completion cannot stall the queue
struct Readmit<'a>(&'a Dispatcher);

impl Drop for Readmit<'_> {
    fn drop(&mut self) {
        self.0.admit();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Dispatcher")
            .field("transport", &self.shared.transport.kind())
            .field("in_flight", &state.in_flight)
            .field("pending", &state.pending.len())
            .finish()
    }
}
