pub mod addr;
mod args;
pub mod cli;
pub mod config;
#[cfg(test)]
mod fixture;
pub mod link;
pub mod node;
pub mod protocol;
mod repl;
pub mod route;
pub mod router;
pub mod send;
mod utils;

pub use args::Args;

/// Trait to be implemented by payload to be sent over the network.
pub trait Message: Sized {
    /// Convert a message into bytes.
    fn into_bytes(self) -> Vec<u8>;
    /// Convert bytes into a message.
    fn from_bytes(bytes: &[u8]) -> Result<Self, protocol::ParseError>;
}
