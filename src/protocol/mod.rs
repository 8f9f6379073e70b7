pub mod advert;
pub mod ipv6;

/// Next-header values this router understands.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum Protocol {
    /// Distance-vector route advertisements.
    Routing,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseProtocolError {
    Unsupported(u8),
}

impl TryFrom<u8> for Protocol {
    type Error = ParseProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Protocol::Routing),
            _ => Err(ParseProtocolError::Unsupported(value)),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(protocol: Protocol) -> u8 {
        match protocol {
            Protocol::Routing => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("packet of {0} bytes is too short for an IPv6 header")]
    TooShortForHeader(usize),
    #[error("payload of {0} bytes is too short for an advertisement")]
    TooShortForAdvertisement(usize),
}
