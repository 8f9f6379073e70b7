//! The fixed 40-byte IPv6 header: parsing received packets and building
//! outgoing ones. Extension headers are not interpreted.

use std::net::Ipv6Addr;

use etherparse::Ipv6Header;

use super::ParseError;

pub const HEADER_LEN: usize = 40;

/// Hop limit used when a builder is not given one.
pub const DEFAULT_HOP_LIMIT: u8 = 64;

const PAYLOAD_LEN_OFFSET: usize = 4;
const NEXT_HEADER_OFFSET: usize = 6;
const HOP_LIMIT_OFFSET: usize = 7;
const SOURCE_OFFSET: usize = 8;
const DESTINATION_OFFSET: usize = 24;

/// A received packet: a 40-byte header and the payload it covers.
///
/// Version, traffic class and flow label are opaque and never checked.
#[derive(Debug)]
pub struct Packet<'a> {
    header: &'a [u8],
    payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Parse a deframed packet.
    ///
    /// The payload is the smaller of the declared payload length and the
    /// bytes actually present, so a lying length field never causes a read
    /// past the buffer.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ParseError> {
        if bytes.len() < HEADER_LEN {
            return Err(ParseError::TooShortForHeader(bytes.len()));
        }

        let (header, rest) = bytes.split_at(HEADER_LEN);
        let declared = usize::from(u16::from_be_bytes([
            header[PAYLOAD_LEN_OFFSET],
            header[PAYLOAD_LEN_OFFSET + 1],
        ]));
        let payload = &rest[..declared.min(rest.len())];

        Ok(Self { header, payload })
    }

    fn addr_at(&self, offset: usize) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(&self.header[offset..offset + 16]);
        Ipv6Addr::from(octets)
    }

    pub fn source(&self) -> Ipv6Addr {
        self.addr_at(SOURCE_OFFSET)
    }

    pub fn destination(&self) -> Ipv6Addr {
        self.addr_at(DESTINATION_OFFSET)
    }

    pub fn next_header(&self) -> u8 {
        self.header[NEXT_HEADER_OFFSET]
    }

    pub fn hop_limit(&self) -> u8 {
        self.header[HOP_LIMIT_OFFSET]
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Copy `packet` with its hop limit set to `hop_limit`. Every other byte,
/// including version, class and flow label, is carried over untouched.
pub fn rewrite_hop_limit(packet: &[u8], hop_limit: u8) -> Result<Vec<u8>, ParseError> {
    if packet.len() < HEADER_LEN {
        return Err(ParseError::TooShortForHeader(packet.len()));
    }
    let mut copy = packet.to_vec();
    copy[HOP_LIMIT_OFFSET] = hop_limit;
    Ok(copy)
}

#[derive(Default, Copy, Clone)]
pub struct Ipv6PacketBuilder<'a> {
    payload: Option<&'a [u8]>,
    hop_limit: Option<u8>,
    next_header: Option<u8>,
    src: Option<Ipv6Addr>,
    dst: Option<Ipv6Addr>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("no payload given")]
    NoPayload,
    #[error("no next header given")]
    NoNextHeader,
    #[error("no source address given")]
    NoSourceAddress,
    #[error("no destination address given")]
    NoDestinationAddress,
    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLong(usize),
    #[error("header serialization failed: {0}")]
    Serialize(String),
}

impl<'a> Ipv6PacketBuilder<'a> {
    pub fn with_payload(&mut self, payload: &'a [u8]) -> &mut Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_hop_limit(&mut self, hop_limit: u8) -> &mut Self {
        self.hop_limit = Some(hop_limit);
        self
    }

    pub fn with_next_header<P: Into<u8>>(&mut self, next_header: P) -> &mut Self {
        self.next_header = Some(next_header.into());
        self
    }

    pub fn with_src(&mut self, src: Ipv6Addr) -> &mut Self {
        self.src = Some(src);
        self
    }

    pub fn with_dst(&mut self, dst: Ipv6Addr) -> &mut Self {
        self.dst = Some(dst);
        self
    }

    /// Serialize a header (version 6, traffic class and flow label zero)
    /// followed by the payload.
    pub fn build(self) -> Result<Vec<u8>, BuildError> {
        let payload = self.payload.ok_or(BuildError::NoPayload)?;
        let payload_length: u16 = payload
            .len()
            .try_into()
            .map_err(|_| BuildError::PayloadTooLong(payload.len()))?;
        let next_header = self.next_header.ok_or(BuildError::NoNextHeader)?;
        let src = self.src.ok_or(BuildError::NoSourceAddress)?;
        let dst = self.dst.ok_or(BuildError::NoDestinationAddress)?;
        let hop_limit = self.hop_limit.unwrap_or(DEFAULT_HOP_LIMIT);

        let header = Ipv6Header {
            traffic_class: 0,
            flow_label: 0,
            payload_length,
            next_header,
            hop_limit,
            source: src.octets(),
            destination: dst.octets(),
        };

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        header
            .write(&mut buf)
            .map_err(|e| BuildError::Serialize(format!("{e:?}")))?;
        buf.extend_from_slice(payload);

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    fn ip(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn build_packet_wire_layout() {
        let payload = [0xaa; 6];
        let bytes = Ipv6PacketBuilder::default()
            .with_src(ip("2001:db8:1::1"))
            .with_dst(ip("ff02::1"))
            .with_hop_limit(1)
            .with_next_header(Protocol::Routing)
            .with_payload(&payload)
            .build()
            .unwrap();

        assert_eq!(bytes.len(), HEADER_LEN + payload.len());
        assert_eq!(&bytes[0..4], &[0x60, 0, 0, 0]);
        assert_eq!(&bytes[4..6], &[0, 6]);
        assert_eq!(bytes[6], 2);
        assert_eq!(bytes[7], 1);
        assert_eq!(&bytes[8..24], &ip("2001:db8:1::1").octets());
        assert_eq!(&bytes[24..40], &ip("ff02::1").octets());
        assert_eq!(&bytes[40..], &payload);
    }

    #[test]
    fn parse_built_packet() {
        let bytes = Ipv6PacketBuilder::default()
            .with_src(ip("2001:db8:1::2"))
            .with_dst(ip("2001:db8:2::9"))
            .with_next_header(59u8)
            .with_payload(b"hello")
            .build()
            .unwrap();

        let packet = Packet::parse(&bytes).unwrap();
        assert_eq!(packet.source(), ip("2001:db8:1::2"));
        assert_eq!(packet.destination(), ip("2001:db8:2::9"));
        assert_eq!(packet.next_header(), 59);
        assert_eq!(packet.hop_limit(), DEFAULT_HOP_LIMIT);
        assert_eq!(packet.payload(), b"hello");
    }

    #[test]
    fn reject_short_buffer() {
        let bytes = [0x60; HEADER_LEN - 1];
        assert_eq!(
            Packet::parse(&bytes).unwrap_err(),
            ParseError::TooShortForHeader(HEADER_LEN - 1)
        );
        assert!(Packet::parse(&[]).is_err());
    }

    #[test]
    fn payload_clamped_to_buffer() {
        let mut bytes = Ipv6PacketBuilder::default()
            .with_src(ip("2001:db8:1::2"))
            .with_dst(ip("2001:db8:2::9"))
            .with_next_header(59u8)
            .with_payload(&[1, 2, 3])
            .build()
            .unwrap();
        // Claim a much longer payload than was sent.
        bytes[4] = 0x10;
        let packet = Packet::parse(&bytes).unwrap();
        assert_eq!(packet.payload(), &[1, 2, 3]);
    }

    #[test]
    fn version_class_and_flow_are_not_checked() {
        let mut bytes = Ipv6PacketBuilder::default()
            .with_src(ip("2001:db8:1::2"))
            .with_dst(ip("2001:db8:2::9"))
            .with_next_header(59u8)
            .with_hop_limit(3)
            .with_payload(b"abc")
            .build()
            .unwrap();
        bytes[..4].copy_from_slice(&[0x00, 0xff, 0xff, 0xff]);

        let packet = Packet::parse(&bytes).unwrap();
        assert_eq!(packet.source(), ip("2001:db8:1::2"));
        assert_eq!(packet.destination(), ip("2001:db8:2::9"));
        assert_eq!(packet.hop_limit(), 3);
        assert_eq!(packet.payload(), b"abc");
    }

    #[test]
    fn rewrite_hop_limit_changes_one_byte() {
        let original = Ipv6PacketBuilder::default()
            .with_src(ip("2001:db8:1::2"))
            .with_dst(ip("2001:db8:2::9"))
            .with_next_header(17u8)
            .with_hop_limit(9)
            .with_payload(b"payload")
            .build()
            .unwrap();

        let rewritten = rewrite_hop_limit(&original, 8).unwrap();
        assert_eq!(rewritten.len(), original.len());
        for (i, (a, b)) in original.iter().zip(rewritten.iter()).enumerate() {
            if i == HOP_LIMIT_OFFSET {
                assert_eq!((*a, *b), (9, 8));
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn builder_requires_addresses() {
        let err = Ipv6PacketBuilder::default()
            .with_next_header(Protocol::Routing)
            .with_payload(&[])
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::NoSourceAddress);
    }
}
