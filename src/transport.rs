//! Cooperative TCP transport. Every call returns after a short bounded wait
//! so the caller can check for user input between calls.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectState {
    Pending,
    Ready,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    /// Nothing arrived within the wait.
    Nothing,
    Data(usize),
    /// The peer closed the connection.
    Closed,
}

/// Opens connections without waiting for them to complete.
pub trait Transport: Send + Sync {
    fn connect(&self, address: &str, port: u16) -> io::Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Send {
    async fn poll_connected(&mut self, wait: Duration) -> ConnectState;

    /// One write. Returns how many bytes the socket accepted.
    async fn send(&mut self, data: &[u8]) -> io::Result<usize>;

    async fn recv(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Received>;

    /// Graceful shutdown.
    async fn close(&mut self);

    /// Immediate teardown.
    fn abort(&mut self);
}

/// Turns a host name into an address string for [`Transport::connect`].
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<String> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .map(|a| a.ip().to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address for host"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn connect(&self, address: &str, port: u16) -> io::Result<Box<dyn Connection>> {
        let ip: IpAddr = address
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let addr = SocketAddr::new(ip, port);
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_nodelay(true)?;
        debug!(%addr, "connecting");
        Ok(Box::new(TcpConnection {
            state: ConnState::Connecting(Box::pin(socket.connect(addr))),
        }))
    }
}

enum ConnState {
    Connecting(BoxFuture<'static, io::Result<TcpStream>>),
    Established(TcpStream),
    Closed,
}

pub struct TcpConnection {
    state: ConnState,
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not connected")
}

#[async_trait]
impl Connection for TcpConnection {
    async fn poll_connected(&mut self, wait: Duration) -> ConnectState {
        let pending = match &mut self.state {
            ConnState::Established(_) => return ConnectState::Ready,
            ConnState::Closed => return ConnectState::Failed,
            ConnState::Connecting(pending) => pending,
        };
        match tokio::time::timeout(wait, pending).await {
            Err(_) => ConnectState::Pending,
            Ok(Ok(stream)) => {
                self.state = ConnState::Established(stream);
                ConnectState::Ready
            }
            Ok(Err(e)) => {
                debug!(error = %e, "connect failed");
                self.state = ConnState::Closed;
                ConnectState::Failed
            }
        }
    }

    async fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            ConnState::Established(stream) => stream.write(data).await,
            _ => Err(not_connected()),
        }
    }

    async fn recv(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Received> {
        let ConnState::Established(stream) = &mut self.state else {
            return Err(not_connected());
        };
        match tokio::time::timeout(wait, stream.read(buf)).await {
            Err(_) => Ok(Received::Nothing),
            Ok(Ok(0)) => Ok(Received::Closed),
            Ok(Ok(n)) => Ok(Received::Data(n)),
            Ok(Err(e)) => Err(e),
        }
    }

    async fn close(&mut self) {
        if let ConnState::Established(mut stream) = std::mem::replace(&mut self.state, ConnState::Closed) {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "shutdown failed");
            }
            debug!("connection closed");
        }
    }

    fn abort(&mut self) {
        if !matches!(self.state, ConnState::Closed) {
            debug!("connection aborted");
        }
        self.state = ConnState::Closed;
    }
}
