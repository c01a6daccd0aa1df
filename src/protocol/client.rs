use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;

use super::queue::{Dispatch, RequestQueue};
use super::service::PoseService;
use super::wire::{PoseRequest, PoseResponse, WireBone, WireWeights};
use crate::errors::{PoseError, Result};
use crate::skeleton::ManualPose;

pub type ResponseCallback = Box<dyn FnOnce(Result<PoseResponse>) + Send + 'static>;

/// Delivers a request and eventually invokes the callback exactly once,
/// from any thread.
pub trait PoseTransport: Send + Sync {
    fn send(&self, request: PoseRequest, on_done: ResponseCallback);
}

// ============================================================================
// Transports
// ============================================================================

/// Runs requests against an in-process [`PoseService`], answering inline.
pub struct LocalTransport {
    service: Arc<PoseService>,
}

impl LocalTransport {
    #[must_use]
    pub fn new(service: Arc<PoseService>) -> Self {
        Self { service }
    }
}

impl PoseTransport for LocalTransport {
    fn send(&self, request: PoseRequest, on_done: ResponseCallback) {
        on_done(Ok(self.service.handle(&request)));
    }
}

/// POSTs requests as JSON to a pose endpoint.
#[cfg(feature = "http")]
pub struct HttpTransport {
    url: String,
}

#[cfg(feature = "http")]
impl HttpTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[cfg(feature = "http")]
impl PoseTransport for HttpTransport {
    fn send(&self, request: PoseRequest, on_done: ResponseCallback) {
        let body = match serde_json::to_vec(&request) {
            Ok(body) => body,
            Err(e) => return on_done(Err(e.into())),
        };
        let mut http_request = ehttp::Request::post(&self.url, body);
        http_request.headers.insert("Content-Type", "application/json");

        ehttp::fetch(http_request, move |result| {
            let outcome = match result {
                Err(message) => Err(PoseError::Transport(message)),
                Ok(response) if !response.ok => Err(PoseError::HttpResponseError {
                    status: response.status,
                }),
                Ok(response) => serde_json::from_slice::<PoseResponse>(&response.bytes).map_err(PoseError::from),
            };
            on_done(outcome);
        });
    }
}

// ============================================================================
// PosedFrame
// ============================================================================

/// One complete, mutually consistent (mesh, skeleton) pair.
///
/// `pose` is the absolute manual pose the server applied to produce it, as
/// reported by the server or else derived from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct PosedFrame {
    pub generation: u64,
    pub pose: ManualPose,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub bones: Vec<WireBone>,
    pub weights: BTreeMap<String, WireWeights>,
}

impl PosedFrame {
    fn from_response(generation: u64, pose: ManualPose, response: PoseResponse) -> Self {
        Self {
            generation,
            pose: response.applied_pose.unwrap_or(pose),
            vertices: response.vertices.0,
            indices: response.indices,
            normals: response.normals.0,
            bones: response.bones,
            weights: response.weights,
        }
    }

    #[must_use]
    pub fn bone(&self, name: &str) -> Option<&WireBone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

// ============================================================================
// PoseClient
// ============================================================================

/// What [`PoseClient::poll`] observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A new frame replaced the previous one.
    Applied { generation: u64 },
    /// A superseded or stale response was dropped.
    Discarded { generation: u64 },
    /// The service answered `status: "error"` or an unreadable body; the
    /// last frame is kept.
    Rejected { message: String },
    /// Network or HTTP failure, worth retrying; the last frame is kept.
    TransportFailed { message: String },
}

type Delivery = (u64, ManualPose, Result<PoseResponse>);

/// Host-agnostic pose protocol client.
///
/// Requests go through a single-slot [`RequestQueue`]; responses travel back
/// over a channel and are only applied on the thread that calls
/// [`PoseClient::poll`]. The current frame is swapped as a whole, so a
/// failed or stale response never leaves a half-updated view.
pub struct PoseClient {
    transport: Arc<dyn PoseTransport>,
    queue: RequestQueue<PoseRequest>,
    tx: flume::Sender<Delivery>,
    rx: flume::Receiver<Delivery>,
    frame: Option<Arc<PosedFrame>>,
    last_error: Option<String>,
    disposed: bool,
}

impl PoseClient {
    #[must_use]
    pub fn init(transport: Arc<dyn PoseTransport>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            transport,
            queue: RequestQueue::new(),
            tx,
            rx,
            frame: None,
            last_error: None,
            disposed: false,
        }
    }

    /// Stops accepting requests. Responses still in transit are dropped.
    pub fn dispose(&mut self) {
        self.queue.reset();
        self.disposed = true;
        while self.rx.try_recv().is_ok() {}
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Submits a request; it is sent now or coalesced behind the one in flight.
    pub fn request(&mut self, request: PoseRequest) -> Result<()> {
        if self.disposed {
            return Err(PoseError::Disposed);
        }
        if let Some(dispatch) = self.queue.submit(request) {
            self.send(dispatch);
        }
        Ok(())
    }

    fn send(&self, dispatch: Dispatch<PoseRequest>) {
        let tx = self.tx.clone();
        let generation = dispatch.generation;
        let pose = dispatch.request.effective_pose();
        log::debug!("Dispatching pose request {generation}");
        self.transport.send(
            dispatch.request,
            Box::new(move |result| {
                // The receiver is gone once the client is dropped.
                let _ = tx.send((generation, pose, result));
            }),
        );
    }

    /// Applies every response that has arrived since the last call.
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if self.disposed {
            return events;
        }
        while let Ok((generation, pose, result)) = self.rx.try_recv() {
            let completion = self.queue.complete(generation);
            if let Some(next) = completion.next {
                self.send(next);
            }
            if !completion.apply {
                events.push(ClientEvent::Discarded { generation });
                continue;
            }
            match result {
                Ok(response) if response.is_success() => {
                    self.frame = Some(Arc::new(PosedFrame::from_response(generation, pose, response)));
                    self.last_error = None;
                    events.push(ClientEvent::Applied { generation });
                }
                Ok(response) => {
                    let message = response.message.unwrap_or_else(|| "unknown error".to_string());
                    events.push(self.fail(generation, &PoseError::Rejected(message)));
                }
                Err(e) => events.push(self.fail(generation, &e)),
            }
        }
        events
    }

    /// Records a failed request; the current frame stays in place.
    fn fail(&mut self, generation: u64, error: &PoseError) -> ClientEvent {
        log::warn!("Pose request {generation} failed: {error}");
        let message = error.to_string();
        self.last_error = Some(message.clone());
        if error.is_transport() {
            ClientEvent::TransportFailed { message }
        } else {
            ClientEvent::Rejected { message }
        }
    }

    /// The most recently applied frame.
    #[must_use]
    pub fn frame(&self) -> Option<Arc<PosedFrame>> {
        self.frame.clone()
    }

    /// Message of the last failed request, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.queue.is_idle()
    }
}
