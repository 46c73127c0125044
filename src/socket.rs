use std::net;
use std::sync::Arc;
use std::time;

const SOCKET_POLLING_KEY: usize = 0;

// Large enough that oversized datagrams are seen at their true length and rejected
const RECV_BUFFER_SIZE: usize = 2048;

pub struct SocketTx {
    // Reference to non-blocking socket
    socket: Arc<net::UdpSocket>,
}

pub struct SocketRx {
    // Reference to non-blocking socket
    socket: Arc<net::UdpSocket>,
    // Cached from socket initialization
    local_addr: net::SocketAddr,
    // Polling objects
    poller: polling::Poller,
    poller_events: polling::Events,
    // Always-allocated receive buffer
    recv_buffer: Box<[u8]>,
}

impl SocketTx {
    pub fn send(&self, datagram: &[u8], addr: &net::SocketAddr) -> std::io::Result<()> {
        self.socket.send_to(datagram, addr)?;
        Ok(())
    }
}

impl SocketRx {
    /// If a datagram can be read from the socket, returns it along with its source address.
    /// Returns Ok(None) otherwise.
    pub fn try_read(&mut self) -> std::io::Result<Option<(&[u8], net::SocketAddr)>> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((len, source_addr)) => {
                let bytes = &self.recv_buffer[..len];
                Ok(Some((bytes, source_addr)))
            }
            Err(err) => match err.kind() {
                // The only acceptable error is WouldBlock, indicating no datagram
                std::io::ErrorKind::WouldBlock => Ok(None),
                _ => Err(err),
            },
        }
    }

    /// Blocks for a duration of up to `timeout` until the socket becomes readable. Returns true if
    /// it did; false on timeout or a spurious wakeup.
    pub fn wait_readable(&mut self, timeout: Option<time::Duration>) -> std::io::Result<bool> {
        // Re-arm interest (must be done prior to each wait() call)
        self.poller
            .modify(&*self.socket, polling::Event::readable(SOCKET_POLLING_KEY))?;

        self.poller_events.clear();

        let n = self.poller.wait(&mut self.poller_events, timeout)?;

        Ok(n > 0)
    }

    pub fn local_addr(&self) -> net::SocketAddr {
        self.local_addr
    }
}

/// Binds a non-blocking UDP socket and splits it into send and receive halves.
pub fn bind<A>(bind_address: A) -> std::io::Result<(SocketTx, SocketRx)>
where
    A: net::ToSocketAddrs,
{
    let socket = net::UdpSocket::bind(bind_address)?;
    socket.set_nonblocking(true)?;

    let local_addr = socket.local_addr()?;

    let poller = polling::Poller::new()?;

    unsafe {
        poller.add(&socket, polling::Event::readable(SOCKET_POLLING_KEY))?;
    }

    let socket_rc = Arc::new(socket);

    let tx = SocketTx {
        socket: Arc::clone(&socket_rc),
    };

    let rx = SocketRx {
        socket: socket_rc,
        local_addr,
        poller,
        poller_events: polling::Events::new(),
        recv_buffer: vec![0; RECV_BUFFER_SIZE].into_boxed_slice(),
    };

    Ok((tx, rx))
}
