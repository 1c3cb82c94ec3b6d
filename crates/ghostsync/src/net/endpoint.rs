use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use super::stats::NetworkStats;

// Oversized datagrams must still be read whole so the size check rejects them.
const RECV_BUFFER_SIZE: usize = 2048;
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;

/// Non-blocking UDP socket tied to a single server address.
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    stats: NetworkStats,
    recv_buffer: [u8; RECV_BUFFER_SIZE],
    reconnect_attempts: u32,
}

impl NetworkEndpoint {
    pub fn connect<A: ToSocketAddrs>(server: A) -> io::Result<Self> {
        let remote_addr = server.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "server address did not resolve")
        })?;

        let socket = Self::open_socket(remote_addr)?;
        let local_addr = socket.local_addr()?;
        log::info!("Opened {} -> {}", local_addr, remote_addr);

        Ok(Self {
            socket,
            local_addr,
            remote_addr,
            stats: NetworkStats::default(),
            recv_buffer: [0u8; RECV_BUFFER_SIZE],
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
        })
    }

    fn open_socket(remote_addr: SocketAddr) -> io::Result<UdpSocket> {
        let bind_addr: SocketAddr = if remote_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(remote_addr)?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn set_reconnect_attempts(&mut self, attempts: u32) {
        self.reconnect_attempts = attempts.max(1);
    }

    pub fn record_dropped(&mut self) {
        self.stats.packets_dropped += 1;
    }

    /// Drops the socket and opens a fresh one to the same server.
    pub fn reconnect(&mut self) -> io::Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.reconnect_attempts {
            match Self::open_socket(self.remote_addr) {
                Ok(socket) => {
                    self.local_addr = socket.local_addr()?;
                    self.socket = socket;
                    self.stats.reconnects += 1;
                    log::info!("Reconnected {} -> {}", self.local_addr, self.remote_addr);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Reconnect attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| io::Error::other("no reconnect attempts allowed")))
    }

    pub fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        let bytes = self.socket.send(data)?;
        self.stats.record_sent(bytes);
        Ok(bytes)
    }

    /// Sends once, and on a transport fault reconnects and tries one more time.
    pub fn send_with_recovery(&mut self, data: &[u8]) -> bool {
        match self.send(data) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Send to {} failed: {}", self.remote_addr, e);
                self.stats.send_failures += 1;

                if self.reconnect().is_err() {
                    return false;
                }

                match self.send(data) {
                    Ok(_) => true,
                    Err(e) => {
                        log::warn!("Send retry to {} failed: {}", self.remote_addr, e);
                        self.stats.send_failures += 1;
                        false
                    }
                }
            }
        }
    }

    fn recv_size(&mut self) -> io::Result<Option<usize>> {
        match self.socket.recv(&mut self.recv_buffer) {
            Ok(size) => {
                self.stats.record_received(size);
                Ok(Some(size))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Next pending datagram, or `None` once the socket is drained. On a
    /// transport fault reconnects and tries one more time.
    pub fn recv_with_recovery(&mut self) -> io::Result<Option<&[u8]>> {
        let size = match self.recv_size() {
            Ok(size) => size,
            Err(e) => {
                log::warn!("Receive from {} failed: {}", self.remote_addr, e);
                self.reconnect()?;
                self.recv_size()?
            }
        };
        Ok(size.map(|size| &self.recv_buffer[..size]))
    }
}
