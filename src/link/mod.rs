//! The boundary between the router and the links it runs over.
//!
//! A [`Transport`] frames and transmits whole packets on numbered
//! interfaces, and delivers whole, deframed packets as they arrive.

pub mod sim;
pub mod slip;

use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;

pub use sim::{SimConfig, SimLinkLayer};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no interface {0}")]
    NoInterface(usize),
    #[error(transparent)]
    Frame(#[from] slip::FrameError),
    #[error("short write on interface {0}")]
    ShortWrite(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One complete packet received on an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub interface: usize,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Transport: 'static + Send + Sync {
    /// Number of interfaces, indexed from 0.
    fn num_interfaces(&self) -> usize;

    /// A short human-readable description of `interface`, if the transport
    /// has one.
    fn describe(&self, _interface: usize) -> Option<String> {
        None
    }

    /// Frame and transmit `packet` on `interface`. Never truncates: a packet
    /// the link cannot carry is an error.
    async fn send(&self, interface: usize, packet: &[u8]) -> Result<()>;

    /// Subscribe to the packets received on every interface.
    async fn listen(&self) -> Receiver<Delivery>;
}
