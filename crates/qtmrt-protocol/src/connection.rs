use std::fmt;
use std::time::Duration;

use qtmrt_frame::FrameConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::engine::{DisconnectCallback, EventCallback, Protocol};
use crate::error::{ProtocolError, Result};
use crate::event::Event;

/// Default TCP port of the little-endian RT interface.
pub const DEFAULT_PORT: u16 = 22223;
/// Protocol version requested right after connecting.
pub const DEFAULT_VERSION: &str = "1.23";
/// Default timeout for connecting and for version negotiation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`connect`].
#[derive(Clone)]
pub struct ConnectConfig {
    /// TCP port on the server.
    pub port: u16,
    /// Protocol version negotiated after connect; a refusal aborts the connection.
    pub version: String,
    /// Bound on the TCP connect and on version negotiation.
    pub timeout: Duration,
    /// Frame size limits for the read loop and writer.
    pub frame: FrameConfig,
    /// Observer for every Event packet.
    pub on_event: Option<EventCallback>,
    /// Called once when the connection goes away.
    pub on_disconnect: Option<DisconnectCallback>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            version: DEFAULT_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            frame: FrameConfig::default(),
            on_event: None,
            on_disconnect: None,
        }
    }
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("port", &self.port)
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .field("frame", &self.frame)
            .field("on_event", &self.on_event.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}

impl ConnectConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Register an observer for every event the server sends.
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.on_event = Some(std::sync::Arc::new(observer));
        self
    }

    /// Register an observer for connection loss. Receives the failure, if any.
    pub fn on_disconnect<F>(mut self, observer: F) -> Self
    where
        F: Fn(Option<&ProtocolError>) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(std::sync::Arc::new(observer));
        self
    }
}

/// Connect to a server and negotiate the protocol version.
pub async fn connect(host: &str, config: ConnectConfig) -> Result<Protocol> {
    let stream = tokio::time::timeout(config.timeout, TcpStream::connect((host, config.port)))
        .await
        .map_err(|_| ProtocolError::Timeout(config.timeout))??;
    stream.set_nodelay(true)?;
    tracing::info!(host, port = config.port, "connected");

    connect_stream(stream, config).await
}

/// Run version negotiation over an already-open stream.
///
/// On failure the stream is closed before the error is returned.
pub async fn connect_stream<S>(stream: S, config: ConnectConfig) -> Result<Protocol>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let protocol = Protocol::start(stream, &config);

    let negotiated = tokio::time::timeout(config.timeout, protocol.set_version(&config.version))
        .await
        .map_err(|_| ProtocolError::Timeout(config.timeout))
        .and_then(|result| result);

    match negotiated {
        Ok(response) => {
            tracing::debug!(
                version = %config.version,
                response = response.text().as_deref().unwrap_or_default(),
                "protocol version set"
            );
            Ok(protocol)
        }
        Err(err) => {
            tracing::error!(version = %config.version, error = %err, "version negotiation failed");
            protocol.disconnect().await;
            Err(match err {
                ProtocolError::Server(reason) => ProtocolError::VersionRejected {
                    version: config.version,
                    reason,
                },
                other => other,
            })
        }
    }
}

/// Validate a `<major>.<minor>` protocol version string.
pub(crate) fn parse_version(version: &str) -> Result<(u16, u16)> {
    let invalid = || ProtocolError::InvalidVersion(version.to_string());
    let mut parts = version.split('.');

    let major = parts.next().ok_or_else(invalid)?;
    let minor = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let major = major.parse::<u16>().map_err(|_| invalid())?;
    let minor = minor.parse::<u16>().map_err(|_| invalid())?;
    Ok((major, minor))
}
