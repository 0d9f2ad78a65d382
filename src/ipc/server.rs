//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! overlay events to subscribed clients. Requests that touch overlay state
//! are forwarded to the controller task and answered through a oneshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::events::OverlayEvent;

use super::protocol::{Request, Response, MAX_MESSAGE_LEN};

/// A request for the overlay controller with its reply slot
#[derive(Debug)]
pub struct ControlMessage {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    control_tx: mpsc::Sender<ControlMessage>,
    event_tx: broadcast::Sender<OverlayEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        control_tx: mpsc::Sender<ControlMessage>,
        event_tx: broadcast::Sender<OverlayEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            control_tx,
            event_tx,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let control_tx = self.control_tx.clone();
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, control_tx, event_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        control_tx: mpsc::Sender<ControlMessage>,
        event_tx: broadcast::Sender<OverlayEvent>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Frames are read on their own task so a push notification never
        // interrupts a partially read request
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut subscription: Option<broadcast::Receiver<OverlayEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match request {
                        Ok(Request::Ping) => Response::Pong,
                        Ok(Request::Subscribe) => {
                            subscription = Some(event_tx.subscribe());
                            debug!("client subscribed to notifications");
                            Response::Subscribed
                        }
                        Ok(request) => {
                            debug!(?request, "received request");
                            Self::forward(&control_tx, request).await
                        }
                        Err(e) => {
                            warn!(?e, "malformed request");
                            Response::error("bad_request", e)
                        }
                    };

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = Self::next_event(&mut subscription) => {
                    match event {
                        Ok(event) => {
                            if let Err(e) = Self::send_message(&mut writer, &Response::Event { event }).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            subscription = None;
                        }
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until EOF
    async fn read_requests<R: AsyncRead + Unpin>(
        mut reader: R,
        request_tx: mpsc::Sender<Result<Request, serde_json::Error>>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            if request_tx.send(serde_json::from_slice(&msg_buf)).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Next event for a subscribed client; pends forever otherwise
    async fn next_event(
        subscription: &mut Option<broadcast::Receiver<OverlayEvent>>,
    ) -> Result<OverlayEvent, broadcast::error::RecvError> {
        match subscription {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Hand a request to the overlay controller and wait for its answer
    async fn forward(control_tx: &mpsc::Sender<ControlMessage>, request: Request) -> Response {
        let (reply, reply_rx) = oneshot::channel();
        if control_tx.send(ControlMessage { request, reply }).await.is_err() {
            return Response::error("unavailable", "overlay is shutting down");
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Response::error("unavailable", "overlay is shutting down"))
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::keybind::KeybindConfig;

    async fn write_frame(stream: &mut UnixStream, body: &[u8]) {
        stream.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();
    }

    async fn read_response(stream: &mut UnixStream) -> Response {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn request(stream: &mut UnixStream, request: &Request) -> Response {
        write_frame(stream, &serde_json::to_vec(request).unwrap()).await;
        read_response(stream).await
    }

    /// Starts a server whose controller answers every request with the
    /// default keybinds
    async fn start_server(
        dir: &tempfile::TempDir,
    ) -> (Arc<Server>, PathBuf, broadcast::Sender<OverlayEvent>) {
        let socket = dir.path().join("overlay.sock");
        let (control_tx, mut control_rx) = mpsc::channel::<ControlMessage>(4);
        let (event_tx, _) = broadcast::channel(16);

        tokio::spawn(async move {
            while let Some(message) = control_rx.recv().await {
                let keybinds = KeybindConfig::default();
                let _ = message.reply.send(Response::Keybinds {
                    controls: keybinds.controls_text(),
                    keybinds,
                });
            }
        });

        let server = Arc::new(Server::new(&socket, control_tx, event_tx.clone()).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = running.run().await;
        });

        (server, socket, event_tx)
    }

    #[tokio::test]
    async fn test_ping_and_forwarded_request() {
        let dir = tempfile::tempdir().unwrap();
        let (server, socket, _events) = start_server(&dir).await;

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        assert!(matches!(request(&mut stream, &Request::Ping).await, Response::Pong));

        match request(&mut stream, &Request::GetKeybinds).await {
            Response::Keybinds { keybinds, .. } => assert_eq!(keybinds, KeybindConfig::default()),
            other => panic!("unexpected response: {other:?}"),
        }

        server.shutdown().await;
        assert!(!socket.exists());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let (_server, socket, events) = start_server(&dir).await;

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        assert!(matches!(
            request(&mut stream, &Request::Subscribe).await,
            Response::Subscribed
        ));

        events.send(OverlayEvent::Hidden).unwrap();
        match read_response(&mut stream).await {
            Response::Event { event } => assert_eq!(event, OverlayEvent::Hidden),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_server, socket, _events) = start_server(&dir).await;

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        write_frame(&mut stream, br#"{"type":"no_such_request"}"#).await;
        match read_response(&mut stream).await {
            Response::Error { code, .. } => assert_eq!(code, "bad_request"),
            other => panic!("unexpected response: {other:?}"),
        }

        // The connection stays usable
        assert!(matches!(request(&mut stream, &Request::Ping).await, Response::Pong));
    }
}
