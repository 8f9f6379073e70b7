//! Route advertisement payload.
//!
//! ```text
//! sender      16 bytes
//! count        4 bytes, big-endian
//! count x { prefix 16 bytes, metric 4 bytes big-endian }
//! ```

use std::net::Ipv6Addr;

use crate::route::Route;
use crate::Message;

use super::ParseError;

/// Size of the sender and count fields that precede the records.
pub const HEADER_LEN: usize = 20;

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct Entry {
    prefix: Ipv6Addr,
    metric: u32,
}

impl Entry {
    pub fn new(prefix: Ipv6Addr, metric: u32) -> Self {
        Self { prefix, metric }
    }

    pub fn prefix(&self) -> Ipv6Addr {
        self.prefix
    }

    pub fn metric(&self) -> u32 {
        self.metric
    }

    pub const fn serialized_size() -> usize {
        20
    }

    fn read(bytes: &[u8; 20]) -> Self {
        let mut prefix = [0; 16];
        prefix.copy_from_slice(&bytes[..16]);
        let mut metric = [0; 4];
        metric.copy_from_slice(&bytes[16..]);
        Self {
            prefix: Ipv6Addr::from(prefix),
            metric: u32::from_be_bytes(metric),
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.prefix.octets());
        buf.extend_from_slice(&self.metric.to_be_bytes());
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Advertisement {
    sender: Ipv6Addr,
    entries: Vec<Entry>,
}

impl Advertisement {
    pub fn new(sender: Ipv6Addr, entries: Vec<Entry>) -> Self {
        Self { sender, entries }
    }

    /// Advertise every route in `routes`. Only prefix and metric go on the
    /// wire.
    pub fn from_routes(sender: Ipv6Addr, routes: &[Route]) -> Self {
        let entries = routes
            .iter()
            .map(|r| Entry::new(r.prefix(), r.metric()))
            .collect();
        Self { sender, entries }
    }

    pub fn sender(&self) -> Ipv6Addr {
        self.sender
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn serialized_size(&self) -> usize {
        HEADER_LEN + self.entries.len() * Entry::serialized_size()
    }
}

impl Message for Advertisement {
    fn into_bytes(self) -> Vec<u8> {
        let count = self.entries.len().min(u32::MAX as usize);
        let mut v = Vec::with_capacity(HEADER_LEN + count * Entry::serialized_size());

        v.extend_from_slice(&self.sender.octets());
        v.extend_from_slice(&(count as u32).to_be_bytes());
        for entry in self.entries.iter().take(count) {
            entry.write(&mut v);
        }

        v
    }

    /// Parse an advertisement payload.
    ///
    /// The record count is clamped to the records that fit in `bytes`; a
    /// count claiming more is not an error, the missing records are simply
    /// absent.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < HEADER_LEN {
            return Err(ParseError::TooShortForAdvertisement(bytes.len()));
        }

        let mut sender = [0; 16];
        sender.copy_from_slice(&bytes[..16]);
        let mut count = [0; 4];
        count.copy_from_slice(&bytes[16..HEADER_LEN]);
        let claimed = u32::from_be_bytes(count) as usize;

        let records = &bytes[HEADER_LEN..];
        let fits = records.len() / Entry::serialized_size();
        if claimed > fits {
            log::warn!(
                "Advertisement claims {} routes but only {} fit, truncating",
                claimed,
                fits
            );
        }

        let entries = records
            .chunks_exact(Entry::serialized_size())
            .take(claimed)
            .filter_map(|chunk| <&[u8; 20]>::try_from(chunk).ok())
            .map(Entry::read)
            .collect();

        Ok(Self {
            sender: Ipv6Addr::from(sender),
            entries,
        })
    }
}
