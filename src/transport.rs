//! Abstract byte-stream transport (§4.2): connect / listen / accept / send /
//! recv / close, presented uniformly so the RSM and CCU cores never touch a
//! raw socket directly. One concrete implementation, TCP/IP, grounded in the
//! teacher's `ipc/tcp_socket.rs` (NODELAY tuning on connect/accept, write_all
//! semantics, two-phase length-then-body reads).

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::error::TransportError;

/// The receiving half of a connected byte stream. `recv_exact` distinguishes
/// a clean peer close (`TransportError::PeerClosed`) from any other I/O
/// failure so callers can apply §4.13's "peer close vs error" distinction
/// without inspecting `io::ErrorKind` themselves.
#[async_trait]
pub trait RecvTransport: Send {
    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

/// The sending half of a connected byte stream.
#[async_trait]
pub trait SendTransport: Send {
    async fn send_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    async fn shutdown(&mut self);
}

/// The teacher's `tcp_socket.rs` duplicates a `std` socket with
/// `try_clone()` to get independent read/write handles for concurrent I/O.
/// Tokio's `TcpStream::into_split` gives the same independent-halves
/// property natively, so the split is done that way here instead.
pub struct TcpTransport {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

pub struct TcpRecvHalf {
    read: OwnedReadHalf,
}

pub struct TcpSendHalf {
    write: OwnedWriteHalf,
}

impl TcpTransport {
    fn tune(stream: &TcpStream) {
        stream.set_nodelay(true).ok();
        let sock_ref = SockRef::from(stream);
        let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(30));
        sock_ref.set_tcp_keepalive(&keepalive).ok();
    }

    fn wrap(stream: TcpStream) -> TcpTransport {
        Self::tune(&stream);
        let peer = stream.peer_addr().ok();
        TcpTransport { stream, peer }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Splits into independently owned read/write halves for a
    /// receiver task and a sender task to use concurrently.
    pub fn split(self) -> (TcpRecvHalf, TcpSendHalf) {
        let (read, write) = self.stream.into_split();
        (TcpRecvHalf { read }, TcpSendHalf { write })
    }
}

#[async_trait]
impl RecvTransport for TcpRecvHalf {
    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        match self.read.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(TransportError::PeerClosed),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SendTransport for TcpSendHalf {
    async fn send_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.write.write_all(bytes).await.map_err(Into::into)
    }

    async fn shutdown(&mut self) {
        let _ = self.write.shutdown().await;
    }
}

/// Binds and listens on `port` with a backlog of 1, per §4.4 step 1: each
/// RSM instance accepts at most one connection at a time.
pub async fn tcp_listen(port: u16) -> Result<TcpListener, TransportError> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    TcpListener::bind(addr).await.map_err(Into::into)
}

pub async fn tcp_accept(listener: &TcpListener) -> Result<(TcpTransport, SocketAddr), TransportError> {
    let (stream, peer) = listener.accept().await?;
    Ok((TcpTransport::wrap(stream), peer))
}

pub async fn tcp_connect(target_ip: &str, port: u16) -> Result<TcpTransport, TransportError> {
    let stream = TcpStream::connect((target_ip, port)).await?;
    Ok(TcpTransport::wrap(stream))
}
