//! Per-connection protocol engine.
//!
//! One read task owns the socket's read half and dispatches every frame to
//! completion before reading the next, so responses are matched to requests
//! strictly in the order the requests were written.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::SinkExt;
use qtmrt_data::DataFrame;
use qtmrt_frame::{Frame, FrameConfig, FrameReader, PacketType, RtCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::oneshot;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectConfig;
use crate::error::{ProtocolError, Result};
use crate::event::Event;

/// Observer for every Event packet, registered at connect time.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;
/// Called once when the read loop ends; `Some` carries the failure.
pub type DisconnectCallback = Arc<dyn Fn(Option<&ProtocolError>) + Send + Sync>;
/// Receives every streamed data frame after the streaming acknowledgement.
///
/// Runs on the read task: nothing else on the connection is processed until
/// it returns, including responses to other requests.
pub type PacketCallback = Arc<dyn Fn(DataFrame) + Send + Sync>;

/// Greeting the server sends on accept; never a response to anything.
const CONNECTED_BANNER: &[u8] = b"QTM RT Interface connected";
/// Resolution of the request that armed streaming.
const STREAMING_ACK: &[u8] = b"Ok";
const READ_CHUNK: usize = 64 * 1024;

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;
type Sink = FramedWrite<BoxedWrite, RtCodec>;

/// What a correlated request resolved to.
#[derive(Debug, Clone)]
pub enum Response {
    /// Uncorrelated send; nothing is expected back.
    Empty,
    /// Command answer text, trailing NUL removed.
    Command(Bytes),
    /// XML document, trailing NUL removed.
    Xml(Bytes),
    /// A single measurement frame (`getcurrentframe`, `streamframes` outside streaming mode).
    Data(DataFrame),
}

impl Response {
    /// Body of a Command or XML response.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Response::Command(body) | Response::Xml(body) => Some(body),
            Response::Empty | Response::Data(_) => None,
        }
    }

    /// Body of a Command or XML response as (lossy) UTF-8.
    pub fn text(&self) -> Option<String> {
        self.body()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    pub fn into_data(self) -> Option<DataFrame> {
        match self {
            Response::Data(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Eventual resolution of a request slot.
///
/// Dropping it (for example after a timeout) leaves the slot queued; the next
/// response is still consumed by it so later requests stay aligned.
#[derive(Debug)]
pub struct PendingResponse {
    state: PendingState,
}

#[derive(Debug)]
enum PendingState {
    Ready(Option<Result<Response>>),
    Waiting(oneshot::Receiver<Result<Response>>),
}

impl PendingResponse {
    fn ready(result: Result<Response>) -> Self {
        Self {
            state: PendingState::Ready(Some(result)),
        }
    }

    fn waiting(rx: oneshot::Receiver<Result<Response>>) -> Self {
        Self {
            state: PendingState::Waiting(rx),
        }
    }

    /// Await the response, giving up after `timeout`.
    pub async fn with_timeout(self, timeout: Duration) -> Result<Response> {
        tokio::time::timeout(timeout, self)
            .await
            .map_err(|_| ProtocolError::Timeout(timeout))?
    }
}

impl Future for PendingResponse {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            PendingState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ProtocolError::Disconnected)))
            }
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(ProtocolError::Disconnected))),
        }
    }
}

struct Slot {
    id: u64,
    tx: oneshot::Sender<Result<Response>>,
}

/// The single outstanding `await_event`. Stays installed until an event
/// matching `filter` (any event when `None`) arrives.
struct EventWaiter {
    filter: Option<Event>,
    tx: oneshot::Sender<Event>,
}

impl EventWaiter {
    fn accepts(&self, event: Event) -> bool {
        self.filter.is_none_or(|wanted| wanted == event)
    }
}

#[derive(Default)]
struct State {
    connected: bool,
    pending: VecDeque<Slot>,
    next_id: u64,
    event_waiter: Option<EventWaiter>,
    on_packet: Option<PacketCallback>,
    /// Streaming was requested and its acknowledging data frame has not arrived yet.
    arming: bool,
}

enum DataRoute {
    /// First frame after streaming was armed: answers the stream request.
    Acknowledge,
    Stream(PacketCallback),
    Respond,
}

struct Shared {
    state: Mutex<State>,
    writer: tokio::sync::Mutex<Option<Sink>>,
    on_event: Option<EventCallback>,
    on_disconnect: Option<DisconnectCallback>,
    shutdown: CancellationToken,
}

/// Handle to one connection's protocol engine. Cheap to clone.
#[derive(Clone)]
pub struct Protocol {
    shared: Arc<Shared>,
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state();
        f.debug_struct("Protocol")
            .field("connected", &state.connected)
            .field("pending", &state.pending.len())
            .field("streaming", &state.on_packet.is_some())
            .field("event_waiter", &state.event_waiter.is_some())
            .finish()
    }
}

impl Protocol {
    /// Attach an engine to an established byte stream and start its read task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(stream: S, config: &ConnectConfig) -> Protocol
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let writer: BoxedWrite = Box::new(writer);

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                connected: true,
                ..State::default()
            }),
            writer: tokio::sync::Mutex::new(Some(FramedWrite::new(
                writer,
                RtCodec::new(config.frame.clone()),
            ))),
            on_event: config.on_event.clone(),
            on_disconnect: config.on_disconnect.clone(),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(read_loop(shared.clone(), reader, config.frame.clone()));
        Protocol { shared }
    }

    /// Whether a transport is still attached.
    pub fn has_transport(&self) -> bool {
        self.shared.state().connected
    }

    /// Number of request slots waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.state().pending.len()
    }

    /// Send a command. With `correlate`, the returned future resolves with the
    /// next unclaimed response; otherwise it is already resolved to
    /// [`Response::Empty`].
    pub async fn send_command(&self, command: &str, correlate: bool) -> Result<PendingResponse> {
        self.send_packet(PacketType::Command, command, correlate)
            .await
    }

    /// Send an XML settings document and queue for its answer.
    pub async fn send_xml(&self, xml: &str) -> Result<PendingResponse> {
        self.send_packet(PacketType::Xml, xml, true).await
    }

    /// Send `text` as a NUL-terminated body under any packet type.
    pub async fn send_packet(
        &self,
        packet_type: PacketType,
        text: &str,
        correlate: bool,
    ) -> Result<PendingResponse> {
        // The writer lock is held from queueing to the end of the write so
        // that queue order always equals wire order.
        let mut writer = self.shared.writer.lock().await;
        let sink = writer.as_mut().ok_or(ProtocolError::NotConnected)?;

        let slot = correlate.then(|| self.shared.push_slot());
        tracing::debug!(%packet_type, text, correlate, "send");

        if let Err(err) = sink.send(Frame::text(packet_type, text)).await {
            if let Some((id, _)) = &slot {
                self.shared.remove_slot(*id);
            }
            return Err(err.into());
        }

        Ok(match slot {
            Some((_, rx)) => PendingResponse::waiting(rx),
            None => PendingResponse::ready(Ok(Response::Empty)),
        })
    }

    /// Queue a slot for a response without sending anything.
    ///
    /// Used for commands the server answers twice.
    pub fn receive_response(&self) -> Result<PendingResponse> {
        if !self.has_transport() {
            return Err(ProtocolError::NotConnected);
        }
        let (_, rx) = self.shared.push_slot();
        Ok(PendingResponse::waiting(rx))
    }

    /// Ask the server to speak protocol `version` (`<major>.<minor>`).
    pub async fn set_version(&self, version: &str) -> Result<Response> {
        crate::connection::parse_version(version)?;
        self.send_command(&format!("version {version}"), true)
            .await?
            .await
    }

    /// Install (`Some`) or remove (`None`) the streaming callback.
    ///
    /// Installing arms streaming: the next data frame acknowledges the
    /// stream request and every later one goes to the callback.
    pub fn set_streaming_callback(&self, callback: Option<PacketCallback>) {
        let mut state = self.shared.state();
        state.arming = callback.is_some();
        state.on_packet = callback;
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.state().on_packet.is_some()
    }

    /// Wait for the next event, or for the next event equal to `filter`.
    ///
    /// Only one wait may be outstanding per connection. A wait abandoned by
    /// its caller (timed out or dropped) does not count.
    pub async fn await_event(
        &self,
        filter: Option<Event>,
        timeout: Option<Duration>,
    ) -> Result<Event> {
        if !self.has_transport() {
            return Err(ProtocolError::NotConnected);
        }
        let rx = self.shared.install_waiter(filter)?;
        let wait = async move { rx.await.map_err(|_| ProtocolError::Disconnected) };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ProtocolError::Timeout(limit))?,
            None => wait.await,
        }
    }

    /// Close the connection. The disconnect observer fires from the read task.
    pub async fn disconnect(&self) {
        let sink = self.shared.writer.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(err) = sink.close().await {
                tracing::debug!(error = %err, "error while closing writer");
            }
        }
        self.shared.state().connected = false;
        self.shared.shutdown.cancel();
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_slot(&self) -> (u64, oneshot::Receiver<Result<Response>>) {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state();
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state.pending.push_back(Slot { id, tx });
        (id, rx)
    }

    fn remove_slot(&self, id: u64) {
        self.state().pending.retain(|slot| slot.id != id);
    }

    fn install_waiter(&self, filter: Option<Event>) -> Result<oneshot::Receiver<Event>> {
        let mut state = self.state();
        if let Some(existing) = &state.event_waiter {
            if !existing.tx.is_closed() {
                return Err(ProtocolError::EventWaitBusy);
            }
            tracing::debug!("replacing abandoned event waiter");
        }
        let (tx, rx) = oneshot::channel();
        state.event_waiter = Some(EventWaiter { filter, tx });
        Ok(rx)
    }

    fn resolve_oldest(&self, result: Result<Response>) {
        let slot = self.state().pending.pop_front();
        match slot {
            Some(slot) => {
                if slot.tx.send(result).is_err() {
                    tracing::debug!(id = slot.id, "response claimed by an abandoned request");
                }
            }
            None => match result {
                Err(err) => tracing::warn!(error = %err, "server error with no pending request"),
                Ok(_) => tracing::debug!("response with no pending request dropped"),
            },
        }
    }

    fn dispatch(&self, frame: Frame) {
        let packet_type = match frame.packet_type() {
            Ok(packet_type) => packet_type,
            Err(_) => {
                tracing::warn!(type_tag = frame.type_tag, "unhandled packet type");
                return;
            }
        };

        match packet_type {
            PacketType::Error => {
                let message = String::from_utf8_lossy(&frame.text_body()).into_owned();
                tracing::debug!(%message, "error");
                {
                    let mut state = self.state();
                    if state.arming {
                        state.arming = false;
                        state.on_packet = None;
                    }
                }
                self.resolve_oldest(Err(ProtocolError::Server(message)));
            }
            PacketType::Command => {
                let body = frame.text_body();
                if body.as_ref() == CONNECTED_BANNER {
                    tracing::debug!("server greeting");
                    return;
                }
                tracing::debug!(response = %String::from_utf8_lossy(&body), "response");
                self.resolve_oldest(Ok(Response::Command(body)));
            }
            PacketType::Xml => {
                let body = frame.text_body();
                tracing::debug!(bytes = body.len(), "xml");
                self.resolve_oldest(Ok(Response::Xml(body)));
            }
            PacketType::Data => self.on_data(frame.payload),
            PacketType::Event => self.on_event(&frame.payload),
            PacketType::NoMoreData => tracing::debug!("no more data"),
            other => tracing::warn!(packet_type = %other, "unhandled packet type"),
        }
    }

    fn on_data(&self, payload: Bytes) {
        let route = {
            let mut state = self.state();
            match state.on_packet.clone() {
                Some(_) if state.arming => {
                    state.arming = false;
                    DataRoute::Acknowledge
                }
                Some(callback) => DataRoute::Stream(callback),
                None => DataRoute::Respond,
            }
        };

        match route {
            DataRoute::Acknowledge => {
                tracing::debug!("streaming acknowledged");
                self.resolve_oldest(Ok(Response::Command(Bytes::from_static(STREAMING_ACK))));
            }
            DataRoute::Stream(callback) => match DataFrame::parse(payload) {
                Ok(frame) => callback(frame),
                Err(err) => tracing::warn!(error = %err, "dropping malformed data frame"),
            },
            DataRoute::Respond => {
                let result = DataFrame::parse(payload)
                    .map(Response::Data)
                    .map_err(ProtocolError::from);
                self.resolve_oldest(result);
            }
        }
    }

    fn on_event(&self, payload: &[u8]) {
        let Some(event) = payload.first().copied().and_then(Event::from_u8) else {
            tracing::warn!(payload = ?payload, "unknown event");
            return;
        };
        tracing::info!(%event, "event");

        let waiter = {
            let mut state = self.state();
            if state
                .event_waiter
                .as_ref()
                .is_some_and(|waiter| waiter.accepts(event))
            {
                state.event_waiter.take()
            } else {
                None
            }
        };
        if let Some(waiter) = waiter {
            // A closed receiver belongs to a wait that already gave up.
            let _ = waiter.tx.send(event);
        }
        if let Some(observer) = &self.on_event {
            observer(event);
        }
    }

    async fn detach(&self, failure: Option<ProtocolError>) {
        self.state().connected = false;
        let sink = self.writer.lock().await.take();
        if let Some(mut sink) = sink {
            let _ = sink.close().await;
        }

        match &failure {
            Some(err) => tracing::warn!(error = %err, "connection lost"),
            None => tracing::info!("disconnected"),
        }
        if let Some(observer) = &self.on_disconnect {
            observer(failure.as_ref());
        }
    }
}

async fn read_loop<R>(shared: Arc<Shared>, mut reader: R, config: FrameConfig)
where
    R: AsyncRead + Unpin,
{
    let mut frames = FrameReader::with_config(config);
    let mut chunk = vec![0u8; READ_CHUNK];

    let failure = loop {
        let read = tokio::select! {
            _ = shared.shutdown.cancelled() => break None,
            read = reader.read(&mut chunk) => read,
        };
        match read {
            Ok(0) => break None,
            Ok(n) => match frames.feed(&chunk[..n]) {
                Ok(batch) => {
                    for frame in batch {
                        shared.dispatch(frame);
                    }
                }
                Err(err) => break Some(ProtocolError::Frame(err)),
            },
            Err(err) => break Some(ProtocolError::Io(err)),
        }
    };

    shared.detach(failure).await;
}
