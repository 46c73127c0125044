//! Mapping from role identity to UDP address.
//!
//! Role ids start at 1. Receiver *k* listens on `5000 + k - 1`, sender *k* receives its
//! acknowledgments on `4000 + k - 1`, and the router listens on 6000.

use std::net;

use crate::error::{Error, Result};

pub const ROUTER_PORT: u16 = 6000;
pub const RECEIVER_PORT_BASE: u16 = 5000;
pub const SENDER_PORT_BASE: u16 = 4000;

// Highest id for which both port ranges stay disjoint
pub const ROLE_ID_MAX: u32 = 1000;

/// Port of role *id* in a range starting at `base`.
pub fn role_port(base: u16, id: u32) -> Result<u16> {
    if id == 0 || id > ROLE_ID_MAX {
        return Err(Error::Config("role id out of range"));
    }

    base.checked_add((id - 1) as u16)
        .ok_or(Error::Config("role port out of range"))
}

pub fn receiver_port(id: u32) -> Result<u16> {
    role_port(RECEIVER_PORT_BASE, id)
}

pub fn sender_port(id: u32) -> Result<u16> {
    role_port(SENDER_PORT_BASE, id)
}

/// Resolves `host:port` to its first address.
pub fn resolve(host: &str, port: u16) -> Result<net::SocketAddr> {
    let mut addrs = net::ToSocketAddrs::to_socket_addrs(&(host, port))
        .map_err(|err| Error::Resolve(format!("{host}:{port}: {err}")))?;

    addrs
        .next()
        .ok_or_else(|| Error::Resolve(format!("{host}:{port}: no addresses")))
}

pub fn router_addr(host: &str) -> Result<net::SocketAddr> {
    resolve(host, ROUTER_PORT)
}

pub fn receiver_addr(host: &str, id: u32) -> Result<net::SocketAddr> {
    resolve(host, receiver_port(id)?)
}

pub fn sender_addr(host: &str, id: u32) -> Result<net::SocketAddr> {
    resolve(host, sender_port(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_plan() {
        assert_eq!(receiver_port(1).unwrap(), 5000);
        assert_eq!(receiver_port(2).unwrap(), 5001);
        assert_eq!(sender_port(3).unwrap(), 4002);

        assert!(receiver_port(0).is_err());
        assert!(sender_port(ROLE_ID_MAX + 1).is_err());
    }

    #[test]
    fn resolves_loopback() {
        let addr = receiver_addr("127.0.0.1", 2).unwrap();
        assert_eq!(addr, "127.0.0.1:5001".parse().unwrap());

        assert_eq!(router_addr("127.0.0.1").unwrap().port(), ROUTER_PORT);
    }

    #[test]
    fn unresolvable_host() {
        assert!(matches!(
            resolve("no such host", 1),
            Err(Error::Resolve(_))
        ));
    }
}
