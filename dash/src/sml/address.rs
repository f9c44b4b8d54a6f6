use std::fmt;
use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::consensus::{Decodable, Encodable, encode};

/// The network address a masternode announces.
///
/// On the wire the ip is always 16 bytes, IPv4 addresses being IPv4-mapped IPv6, and the
/// port is big-endian.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct ServiceAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl ServiceAddress {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        ServiceAddress { ip, port }
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// An all-zero address, which Dash Core uses for masternodes without a service.
    pub fn is_unspecified(&self) -> bool {
        self.ip.is_unspecified() && self.port == 0
    }
}

impl Default for ServiceAddress {
    fn default() -> Self {
        ServiceAddress { ip: IpAddr::V6(Ipv6Addr::UNSPECIFIED), port: 0 }
    }
}

impl From<SocketAddr> for ServiceAddress {
    fn from(value: SocketAddr) -> Self {
        ServiceAddress { ip: value.ip(), port: value.port() }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_socket_addr())
    }
}

impl Encodable for ServiceAddress {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let ip = match self.ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        writer.write_all(&ip.octets())?;
        writer.write_all(&self.port.to_be_bytes())?;
        Ok(18)
    }
}

impl Decodable for ServiceAddress {
    fn consensus_decode<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self, encode::Error> {
        let octets: [u8; 16] = Decodable::consensus_decode(reader)?;
        let port: [u8; 2] = Decodable::consensus_decode(reader)?;
        let v6 = Ipv6Addr::from(octets);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        Ok(ServiceAddress { ip, port: u16::from_be_bytes(port) })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn ipv4_is_mapped() {
        let address = ServiceAddress::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 9999);
        let bytes = serialize(&address);
        assert_eq!(
            bytes,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 1, 2, 3, 4, 0x27, 0x0f]
        );
        assert_eq!(deserialize::<ServiceAddress>(&bytes).expect("address"), address);
        assert_eq!(address.to_string(), "1.2.3.4:9999");
    }

    #[test]
    fn unspecified() {
        let address: ServiceAddress = deserialize(&[0u8; 18]).expect("address");
        assert!(address.is_unspecified());
    }
}
