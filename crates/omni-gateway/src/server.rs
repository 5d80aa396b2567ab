//! TCP server hosting the protocol core.
//!
//! Every accepted socket gets its own [`ConnectionSession`], sentence codec and
//! outbound queue. The socket task reads sentences, runs them through the
//! decoder and writes replies and platform commands back in arrival order.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use omni_metrics::{metric_defs, metrics, MetricLabels};
use omni_protocol::constants::IDENTITY_INDEX;
use omni_protocol::{
    Command, ConnectionSession, DecodeContext, Decoder, DeviceLookup, Encoder, ReplySink, Sentence,
    TelemetryUpdate,
};
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::codec::SentenceCodec;
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::registry::DeviceRegistry;

/// Queued outbound frames per connection.
const OUTBOUND_QUEUE: usize = 64;

/// Queued updates waiting for the platform.
const UPDATE_QUEUE: usize = 1024;

/// Read buffer size per socket.
const READ_BUF_SIZE: usize = 1024;

/// Handle for writing to a connected device.
#[derive(Clone)]
struct ConnectionHandle {
    id: u64,
    session: Arc<Mutex<ConnectionSession>>,
    outbound: mpsc::Sender<Vec<u8>>,
}

/// Reply sink that queues frames on a connection's outbound channel.
struct OutboundSink<'a>(&'a mpsc::Sender<Vec<u8>>);

impl ReplySink for OutboundSink<'_> {
    fn send(&mut self, data: Vec<u8>, remote: Option<SocketAddr>) {
        if self.0.try_send(data).is_err() {
            warn!(?remote, "outbound queue full or closed, reply dropped");
        }
    }
}

/// The gateway: device directory, codec pair and live connections.
pub struct Gateway {
    config: GatewayConfig,
    registry: Arc<DeviceRegistry>,
    decoder: Decoder,
    encoder: Encoder,
    connections: RwLock<HashMap<u64, ConnectionHandle>>,
    updates: mpsc::Sender<TelemetryUpdate>,
    labels: MetricLabels,
    next_connection_id: AtomicU64,
}

impl Gateway {
    /// Create a gateway and the receiver decoded updates are delivered to.
    pub fn new(config: GatewayConfig) -> (Arc<Self>, mpsc::Receiver<TelemetryUpdate>) {
        Self::with_update_capacity(config, UPDATE_QUEUE)
    }

    /// Like [`Gateway::new`], holding at most `capacity` undelivered updates.
    ///
    /// Updates decoded while the queue is full are dropped so that socket
    /// writes never wait on the platform.
    pub fn with_update_capacity(
        config: GatewayConfig,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<TelemetryUpdate>) {
        let (updates, updates_rx) = mpsc::channel(capacity);
        let registry = Arc::new(DeviceRegistry::new(&config.devices));
        let gateway = Gateway {
            decoder: Decoder::new(config.protocol.clone()),
            encoder: Encoder::new(config.protocol.clone()),
            labels: MetricLabels::new(config.protocol.protocol.clone()),
            registry,
            connections: RwLock::new(HashMap::new()),
            updates,
            next_connection_id: AtomicU64::new(1),
            config,
        };
        (Arc::new(gateway), updates_rx)
    }

    /// Gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Device directory.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Whether a device currently has a live connection.
    pub fn is_connected(&self, device_id: u64) -> bool {
        self.connections.read().contains_key(&device_id)
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(self.config.listen).await
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> io::Result<()> {
        info!(addr = ?listener.local_addr().ok(), "accepting device connections");
        loop {
            let (stream, peer) = listener.accept().await?;
            let gateway = Arc::clone(&self);
            let span = info_span!("connection", %peer);
            tokio::spawn(
                async move {
                    if let Err(e) = gateway.handle_connection(stream, peer).await {
                        warn!("connection error: {}", e);
                    }
                }
                .instrument(span),
            );
        }
    }

    /// Encode a platform command and queue it on the device's connection.
    ///
    /// Returns `Ok(false)` when the device is offline, the command type is
    /// not supported, or the outbound queue is full.
    pub fn send_command(&self, command: &Command) -> GatewayResult<bool> {
        let Some(handle) = self.connections.read().get(&command.device_id).cloned() else {
            warn!(device_id = command.device_id, "device is not connected");
            return Ok(false);
        };

        let encoded = {
            let mut session = handle.session.lock();
            self.encoder
                .encode(command, &*self.registry, Some(&mut *session))?
        };
        let Some(data) = encoded else {
            warn!(device_id = command.device_id, kind = %command.kind, "command not supported");
            return Ok(false);
        };

        match handle.outbound.try_send(data) {
            Ok(()) => {
                debug!(device_id = command.device_id, kind = %command.kind, "command queued");
                Ok(true)
            }
            Err(_) => {
                warn!(device_id = command.device_id, "outbound queue full or closed");
                Ok(false)
            }
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Mutex::new(ConnectionSession::new(Some(peer))));
        let (outbound, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE);
        let mut codec = SentenceCodec::new(self.config.max_sentence_len);
        let mut bound = HashSet::new();

        info!(%peer, connection_id, "device connected");
        metrics::gauge!(metric_defs::GATEWAY_CONNECTIONS.name, &self.labels.to_labels())
            .increment(1.0);

        let (mut reader, mut writer) = stream.split();
        let mut read_buf = [0u8; READ_BUF_SIZE];

        let result = loop {
            tokio::select! {
                read = reader.read(&mut read_buf) => {
                    let n = match read {
                        Ok(0) => break Ok(()),
                        Ok(n) => n,
                        Err(e) => break Err(e),
                    };
                    codec.push(&read_buf[..n]);
                    loop {
                        match codec.decode_sentence() {
                            Ok(Some(raw)) => {
                                let handle = ConnectionHandle {
                                    id: connection_id,
                                    session: Arc::clone(&session),
                                    outbound: outbound.clone(),
                                };
                                if let Some(update) = self.process_sentence(&handle, &raw, &mut bound) {
                                    self.deliver(update);
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!(%peer, "{}", e);
                                metrics::counter!(
                                    metric_defs::GATEWAY_OVERSIZED.name,
                                    &self.labels.to_labels()
                                )
                                .increment(1);
                            }
                        }
                    }
                }

                Some(data) = outbound_rx.recv() => {
                    if let Err(e) = writer.write_all(&data).await {
                        break Err(e);
                    }
                    if let Err(e) = writer.flush().await {
                        break Err(e);
                    }
                }
            }
        };

        if codec.buffered_len() > 0 {
            debug!(bytes = codec.buffered_len(), "discarding unterminated sentence");
        }
        {
            let mut connections = self.connections.write();
            for device_id in &bound {
                if connections.get(device_id).map(|h| h.id) == Some(connection_id) {
                    connections.remove(device_id);
                }
            }
        }
        metrics::gauge!(metric_defs::GATEWAY_CONNECTIONS.name, &self.labels.to_labels())
            .decrement(1.0);
        info!(%peer, connection_id, "device disconnected");
        result
    }

    fn deliver(&self, update: TelemetryUpdate) {
        match self.updates.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                warn!(device_id = update.device_id, "update queue full, update dropped");
            }
            Err(TrySendError::Closed(_)) => debug!("update receiver closed"),
        }
    }

    /// Decode one sentence on a connection, binding its device to the socket.
    fn process_sentence(
        &self,
        handle: &ConnectionHandle,
        raw: &str,
        bound: &mut HashSet<u64>,
    ) -> Option<TelemetryUpdate> {
        metrics::histogram!(metric_defs::GATEWAY_SENTENCE_SIZE.name, &self.labels.to_labels())
            .record(raw.len() as f64);

        let mut session = handle.session.lock();
        let remote = session.remote();

        if let Some(unique_id) = Sentence::parse(raw).field(IDENTITY_INDEX) {
            if let Some(device) = self.registry.resolve(remote, unique_id) {
                if bound.insert(device.device_id) {
                    debug!(device_id = device.device_id, ?remote, "device bound to connection");
                }
                self.connections
                    .write()
                    .entry(device.device_id)
                    .and_modify(|h| {
                        if h.id != handle.id {
                            *h = handle.clone();
                        }
                    })
                    .or_insert_with(|| handle.clone());
            }
        }

        let mut sink = OutboundSink(&handle.outbound);
        let mut ctx = DecodeContext {
            connection: &mut *session,
            devices: &*self.registry,
            positions: &*self.registry,
            replies: &mut sink,
        };
        match self.decoder.decode(&mut ctx, raw) {
            Ok(Some(update)) => {
                self.registry.record(&update);
                Some(update)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(?remote, "sentence rejected: {}", e);
                None
            }
        }
    }
}
