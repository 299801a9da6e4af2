//! TCP server for the status protocol.
//!
//! Binds a listener with a backlog of one, accepts a single connection and
//! runs the status session on it until the shutdown future completes or an
//! I/O error ends the process.

use crate::config::Config;
use crate::protocols::status::{self, SessionError};
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// Lifecycle of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Listening, no connection accepted yet.
    AwaitingConnection,
    /// Running the session on the accepted connection.
    ActiveLoop,
    /// Shut down; listener and connection dropped.
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::AwaitingConnection => "awaiting_connection",
            State::ActiveLoop => "active_loop",
            State::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Server instance
pub struct Server {
    config: Config,
    listener: TcpListener,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let listener = create_listener(config.listen, config.backlog)
            .and_then(TcpListener::from_std)
            .map_err(|e| ServerError::Bind(config.listen, e))?;

        Ok(Server { config, listener })
    }

    /// Address the listener is bound to, for tests that bind port 0
    #[cfg(test)]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one connection and serve it until `shutdown` completes.
    ///
    /// `shutdown` is first polled once the connection is accepted, so it
    /// only takes effect in the active loop. Returns `Ok(())` on shutdown.
    /// An accept, read or write failure is returned as an error.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Server { config, listener } = self;

        let stream = match accept_one(&listener, &config).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Server failed");
                return Err(e);
            }
        };

        tokio::select! {
            biased;

            _ = shutdown => {
                info!(state = %State::Closed, "Interrupted, closing connection");
                Ok(())
            }
            result = status::handle_connection(stream, &config) => match result {
                Ok(never) => match never {},
                Err(e) => {
                    let e = ServerError::from(e);
                    error!(error = %e, "Server failed");
                    Err(e)
                }
            },
        }
    }
}

/// Wait for the single connection this server will ever accept.
///
/// The listener is kept open by the caller but never accepted again, so
/// later clients wait in the backlog.
async fn accept_one(listener: &TcpListener, config: &Config) -> Result<TcpStream, ServerError> {
    info!(
        address = %config.listen,
        state = %State::AwaitingConnection,
        "Server listening"
    );

    let (stream, peer) = listener.accept().await.map_err(ServerError::Accept)?;
    info!(peer = %peer, state = %State::ActiveLoop, "Accepted connection");

    Ok(stream)
}

fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

/// Fatal server errors
#[derive(Debug)]
pub enum ServerError {
    Bind(SocketAddr, io::Error),
    Accept(io::Error),
    Session(SessionError),
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        ServerError::Session(e)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Bind(addr, e) => write!(f, "Failed to bind '{}': {}", addr, e),
            ServerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
            ServerError::Session(e) => write!(f, "Session ended: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind(_, e) | ServerError::Accept(e) => Some(e),
            ServerError::Session(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    const STATUS: &[u8] = b"cs3700fall2015 STATUS 5 + 6\n";

    fn test_config() -> Config {
        Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            ..Config::default()
        }
    }

    /// Bind on an ephemeral port and run the server in the background.
    fn start() -> (
        SocketAddr,
        oneshot::Sender<()>,
        JoinHandle<Result<(), ServerError>>,
    ) {
        let server = Server::bind(test_config()).unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));
        (addr, tx, handle)
    }

    async fn expect_status(client: &mut TcpStream) {
        let mut line = [0u8; STATUS.len()];
        client.read_exact(&mut line).await.unwrap();
        assert_eq!(&line[..], STATUS);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::AwaitingConnection.to_string(), "awaiting_connection");
        assert_eq!(State::ActiveLoop.to_string(), "active_loop");
        assert_eq!(State::Closed.to_string(), "closed");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = Server::bind(test_config()).unwrap();
        let taken = first.local_addr().unwrap();
        let config = Config {
            listen: taken,
            ..Config::default()
        };

        match Server::bind(config) {
            Err(ServerError::Bind(addr, _)) => assert_eq!(addr, taken),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("second bind on {taken} succeeded"),
        }
    }

    #[tokio::test]
    async fn test_status_per_receive_then_shutdown() {
        let (addr, tx, handle) = start();
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"hi").await.unwrap();
        expect_status(&mut client).await;

        client.write_all(b"again").await.unwrap();
        expect_status(&mut client).await;

        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());

        // The connection is closed with nothing further written.
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_the_connection() {
        let (addr, tx, handle) = start();

        // Nothing is accepted yet, so the server keeps listening.
        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        // Once connected, the pending shutdown closes the session unanswered.
        let mut client = TcpStream::connect(addr).await.unwrap();
        assert!(handle.await.unwrap().is_ok());

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_second_client_is_never_served() {
        let (addr, tx, handle) = start();

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"one").await.unwrap();
        expect_status(&mut first).await;

        // Queued in the backlog, so the connect itself completes.
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"two").await.unwrap();
        let mut buf = [0u8; 64];
        let waited = tokio::time::timeout(Duration::from_millis(200), second.read(&mut buf)).await;
        assert!(waited.is_err(), "second client got a reply");

        // The first session is unaffected.
        first.write_all(b"three").await.unwrap();
        expect_status(&mut first).await;

        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_half_closed_peer_keeps_getting_status() {
        let (addr, tx, handle) = start();
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"hi").await.unwrap();
        expect_status(&mut client).await;

        // Every zero-byte read still produces a reply.
        client.shutdown().await.unwrap();
        expect_status(&mut client).await;
        expect_status(&mut client).await;
        expect_status(&mut client).await;

        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_disconnected_peer_is_fatal() {
        let (addr, _tx, handle) = start();
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"hi").await.unwrap();
        expect_status(&mut client).await;
        drop(client);

        match handle.await.unwrap() {
            Err(ServerError::Session(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
