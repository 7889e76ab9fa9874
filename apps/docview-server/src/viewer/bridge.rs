//! Viewer Bridge
//!
//! Two readiness signals arrive independently and in either order: the
//! prerequisites finishing and the viewing session id. The control is built
//! exactly once, when both have landed and neither failed. Its events are
//! then republished as watch channels so callers never poll the control.
//!
//! Signals may be reported from threads outside any Tokio runtime. Event
//! forwarding runs on the runtime captured at construction of the bridge,
//! or the one the signal arrived on; with neither it waits for `ready()`.

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot, watch};

use super::bootstrap::{load_prerequisites, ResourceLoader};
use super::control::{ViewerControl, ViewerFactory};
use super::types::{ViewerError, ViewerEvent, ViewerOptions, ViewerPrerequisites, ViewerStatus};

type ControlHandle = Arc<dyn ViewerControl>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prerequisites {
    Pending,
    Loaded,
    Failed,
}

/// A constructed control whose events are not yet being forwarded
struct EventForwarder {
    control: ControlHandle,
    events: broadcast::Receiver<ViewerEvent>,
    ready_tx: Option<oneshot::Sender<ControlHandle>>,
}

struct BridgeState {
    prerequisites: Prerequisites,
    viewing_session_id: Option<String>,
    session_failed: bool,
    constructed: bool,
    ready_tx: Option<oneshot::Sender<ControlHandle>>,
    parked: Option<EventForwarder>,
    waiting_runtime: Option<Handle>,
}

struct BridgeInner {
    factory: Arc<dyn ViewerFactory>,
    options: ViewerOptions,
    runtime: Option<Handle>,
    state: Mutex<BridgeState>,
    ready_rx: Mutex<Option<oneshot::Receiver<ControlHandle>>>,
    status: watch::Sender<ViewerStatus>,
    page: watch::Sender<Option<u32>>,
}

/// Guards construction of one viewer control and bridges its events
#[derive(Clone)]
pub struct ViewerBridge {
    inner: Arc<BridgeInner>,
}

impl ViewerBridge {
    /// Create a bridge, capturing the current Tokio runtime if there is one.
    pub fn new(factory: Arc<dyn ViewerFactory>, options: ViewerOptions) -> Self {
        Self::build(factory, options, Handle::try_current().ok())
    }

    /// Create a bridge whose event forwarding runs on `runtime`.
    pub fn with_runtime(factory: Arc<dyn ViewerFactory>, options: ViewerOptions, runtime: Handle) -> Self {
        Self::build(factory, options, Some(runtime))
    }

    fn build(factory: Arc<dyn ViewerFactory>, options: ViewerOptions, runtime: Option<Handle>) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (status, _) = watch::channel(ViewerStatus::Loading);
        let (page, _) = watch::channel(None);

        Self {
            inner: Arc::new(BridgeInner {
                factory,
                options,
                runtime,
                state: Mutex::new(BridgeState {
                    prerequisites: Prerequisites::Pending,
                    viewing_session_id: None,
                    session_failed: false,
                    constructed: false,
                    ready_tx: Some(ready_tx),
                    parked: None,
                    waiting_runtime: None,
                }),
                ready_rx: Mutex::new(Some(ready_rx)),
                status,
                page,
            }),
        }
    }

    /// Lifecycle status
    pub fn status(&self) -> watch::Receiver<ViewerStatus> {
        self.inner.status.subscribe()
    }

    /// Current page as last reported by a page-changed event
    pub fn current_page(&self) -> watch::Receiver<Option<u32>> {
        self.inner.page.subscribe()
    }

    pub fn is_constructed(&self) -> bool {
        self.inner.state.lock().constructed
    }

    /// Report the outcome of loading prerequisites. Only the first report counts.
    pub fn prerequisites_loaded(&self, result: Result<(), ViewerError>) {
        let mut state = self.inner.state.lock();
        if state.prerequisites != Prerequisites::Pending {
            return;
        }

        match result {
            Ok(()) => {
                state.prerequisites = Prerequisites::Loaded;
                self.inner.try_construct(state);
            }
            Err(e) => {
                state.prerequisites = Prerequisites::Failed;
                self.inner
                    .status
                    .send_replace(ViewerStatus::PrerequisitesFailed(e.to_string()));
                state.ready_tx.take();
            }
        }
    }

    /// Report the viewing session id.
    pub fn session_received(&self, viewing_session_id: &str) {
        let mut state = self.inner.state.lock();
        match &state.viewing_session_id {
            Some(existing) if existing != viewing_session_id => {
                tracing::warn!(
                    viewing_session_id = %viewing_session_id,
                    existing = %existing,
                    "Ignoring second viewing session for this viewer"
                );
                return;
            }
            Some(_) => return,
            None => {}
        }

        state.viewing_session_id = Some(viewing_session_id.to_string());
        self.inner.try_construct(state);
    }

    /// Report that no session id will arrive.
    pub fn session_failed(&self, error: ViewerError) {
        let mut state = self.inner.state.lock();
        if state.viewing_session_id.is_some() || state.session_failed {
            return;
        }

        state.session_failed = true;
        if state.prerequisites != Prerequisites::Failed {
            self.inner
                .status
                .send_replace(ViewerStatus::SessionFailed(error.to_string()));
        }
        state.ready_tx.take();
    }

    /// Wait for the control's ready event and take the control.
    ///
    /// Succeeds at most once per bridge.
    pub async fn ready(&self) -> Result<ControlHandle, ViewerError> {
        let rx = self
            .inner
            .ready_rx
            .lock()
            .take()
            .ok_or(ViewerError::AlreadyTaken)?;

        self.inner.resume_forwarding();

        match rx.await {
            Ok(control) => Ok(control),
            Err(_) => Err(match self.inner.status.borrow().clone() {
                ViewerStatus::PrerequisitesFailed(msg) => ViewerError::PrerequisitesFailed(msg),
                ViewerStatus::SessionFailed(msg) => ViewerError::Request(msg),
                ViewerStatus::ConstructionFailed(msg) => ViewerError::Construction(msg),
                other => ViewerError::NotReady(format!("event stream closed while {:?}", other)),
            }),
        }
    }

    /// Load prerequisites and obtain a session concurrently, feeding both
    /// results into the bridge as they land.
    pub async fn run<L, S>(&self, loader: &L, plan: &ViewerPrerequisites, session: S)
    where
        L: ResourceLoader + ?Sized,
        S: Future<Output = Result<String, ViewerError>>,
    {
        let prerequisites = async {
            let result = load_prerequisites(loader, plan).await;
            self.prerequisites_loaded(result);
        };
        let obtain_session = async {
            match session.await {
                Ok(id) => self.session_received(&id),
                Err(e) => self.session_failed(e),
            }
        };

        tokio::join!(prerequisites, obtain_session);
    }
}

impl BridgeInner {
    /// Construct the control if every precondition holds.
    ///
    /// `constructed` is claimed under the lock, so two signals racing here
    /// cannot both construct. The factory runs with the lock released.
    fn try_construct(self: &Arc<Self>, mut state: MutexGuard<'_, BridgeState>) {
        if state.constructed || state.session_failed || state.prerequisites != Prerequisites::Loaded {
            return;
        }
        let Some(viewing_session_id) = state.viewing_session_id.clone() else {
            return;
        };

        state.constructed = true;
        let ready_tx = state.ready_tx.take();
        drop(state);

        let options = self.options.for_session(&viewing_session_id);
        match self.factory.construct(&options) {
            Ok(control) => {
                let events = control.subscribe();
                self.status.send_replace(ViewerStatus::Constructed);
                tracing::info!(viewing_session_id = %viewing_session_id, "Viewer constructed");

                self.start_forwarding(EventForwarder {
                    control,
                    events,
                    ready_tx,
                });
            }
            Err(e) => {
                tracing::error!(viewing_session_id = %viewing_session_id, error = %e, "Viewer construction failed");
                // Status first: a waiting ready() reads it once the sender is gone
                self.status
                    .send_replace(ViewerStatus::ConstructionFailed(e.to_string()));
                drop(ready_tx);
            }
        }
    }

    fn start_forwarding(self: &Arc<Self>, forwarder: EventForwarder) {
        let mut state = self.state.lock();
        let runtime = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .or_else(|| state.waiting_runtime.clone());

        match runtime {
            Some(handle) => {
                drop(state);
                handle.spawn(Arc::clone(self).forward_events(forwarder));
            }
            None => {
                tracing::debug!("No runtime yet, event forwarding waits for ready()");
                state.parked = Some(forwarder);
            }
        }
    }

    /// Start a parked forwarder on the caller's runtime.
    fn resume_forwarding(self: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };

        let parked = {
            let mut state = self.state.lock();
            state.waiting_runtime = Some(handle.clone());
            state.parked.take()
        };
        if let Some(forwarder) = parked {
            handle.spawn(Arc::clone(self).forward_events(forwarder));
        }
    }

    async fn forward_events(self: Arc<Self>, forwarder: EventForwarder) {
        let EventForwarder {
            control,
            mut events,
            mut ready_tx,
        } = forwarder;
        // Strong until handed out, so a dropped control ends this task
        let mut pending = Some(control);

        loop {
            match events.recv().await {
                Ok(ViewerEvent::ViewerReady) => {
                    if let (Some(tx), Some(control)) = (ready_tx.take(), pending.take()) {
                        self.status.send_replace(ViewerStatus::Ready);
                        let _ = tx.send(control);
                    }
                }
                Ok(ViewerEvent::PageChanged { page_number }) => {
                    self.page.send_replace(Some(page_number));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Viewer events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
