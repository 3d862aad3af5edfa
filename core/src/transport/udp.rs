use super::{Delivery, RecordChannel};
use crate::prelude::{LocalizerError, LocalizerResult};
use crate::telemetry::log::LogManager;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, MutexGuard};

struct Connection {
    socket: UdpSocket,
    endpoint: SocketAddr,
}

/// UDP channel towards a single IPv4 destination.
pub struct UdpChannel {
    inner: Mutex<Option<Connection>>,
    logger: LogManager,
}

impl Default for UdpChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpChannel {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            logger: LogManager::new("udp"),
        }
    }

    /// Creates a channel and connects it to `host:port` when `host` is non-empty.
    pub fn connected_to(host: &str, port: u16) -> LocalizerResult<Self> {
        let channel = Self::new();
        channel.connect(host, port)?;
        Ok(channel)
    }

    fn lock(&self) -> LocalizerResult<MutexGuard<'_, Option<Connection>>> {
        self.inner
            .lock()
            .map_err(|_| LocalizerError::Transport("channel lock poisoned".into()))
    }

    pub fn endpoint(&self) -> Option<SocketAddr> {
        self.lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|conn| conn.endpoint))
    }
}

fn resolve_v4(host: &str, port: u16) -> LocalizerResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|err| LocalizerError::Transport(format!("resolving {}:{}: {}", host, port, err)))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| {
            LocalizerError::Transport(format!("{}:{} has no IPv4 address", host, port))
        })
}

impl RecordChannel for UdpChannel {
    fn connect(&self, host: &str, port: u16) -> LocalizerResult<()> {
        self.disconnect();
        if host.is_empty() {
            return Ok(());
        }

        let endpoint = resolve_v4(host, port)?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_nonblocking(true)?;

        *self.lock()? = Some(Connection { socket, endpoint });
        self.logger
            .record(&format!("position records go to {}", endpoint));
        Ok(())
    }

    fn disconnect(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            if guard.take().is_some() {
                self.logger.record("position channel closed");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn send(&self, payload: &[u8]) -> LocalizerResult<Delivery> {
        let guard = self.lock()?;
        match guard.as_ref() {
            Some(conn) => {
                let sent = conn.socket.send_to(payload, conn.endpoint)?;
                Ok(Delivery::Sent(sent))
            }
            None => Ok(Delivery::Skipped),
        }
    }
}
