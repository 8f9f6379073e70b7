//! Test doubles for the link layer.

use std::collections::HashSet;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{
    broadcast::{self, Receiver, Sender},
    Semaphore,
};

use crate::link::{Delivery, Error, Result, Transport};

/// An in-memory transport that records what it is asked to send.
pub struct MockTransport {
    num_interfaces: usize,
    sent: Mutex<Vec<Delivery>>,
    gate: Option<Arc<Semaphore>>,
    failing: HashSet<usize>,
    incoming: Sender<Delivery>,
}

impl MockTransport {
    pub fn new(num_interfaces: usize) -> Self {
        let (incoming, _) = broadcast::channel(100);
        Self {
            num_interfaces,
            sent: Mutex::new(Vec::new()),
            gate: None,
            failing: HashSet::new(),
            incoming,
        }
    }

    /// A transport whose sends each block until a permit is added to the
    /// returned semaphore.
    pub fn gated(num_interfaces: usize) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut transport = Self::new(num_interfaces);
        transport.gate = Some(gate.clone());
        (transport, gate)
    }

    /// Make every send on `interface` fail.
    pub fn failing_on(mut self, interface: usize) -> Self {
        self.failing.insert(interface);
        self
    }

    pub fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().clone()
    }

    /// Deliver `bytes` to listeners as if received on `interface`.
    pub fn inject(&self, interface: usize, bytes: Vec<u8>) {
        let _ = self.incoming.send(Delivery { interface, bytes });
    }

    /// Wait until at least `n` packets have been sent.
    pub async fn wait_for_sends(&self, n: usize) -> Vec<Delivery> {
        let wait = async {
            loop {
                let sent = self.sent();
                if sent.len() >= n {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for sends")
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn num_interfaces(&self) -> usize {
        self.num_interfaces
    }

    fn describe(&self, interface: usize) -> Option<String> {
        (interface < self.num_interfaces).then(|| format!("mock {interface}"))
    }

    async fn send(&self, interface: usize, packet: &[u8]) -> Result<()> {
        if interface >= self.num_interfaces {
            return Err(Error::NoInterface(interface));
        }
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.failing.contains(&interface) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "link down",
            )));
        }
        self.sent.lock().push(Delivery {
            interface,
            bytes: packet.to_vec(),
        });
        Ok(())
    }

    async fn listen(&self) -> Receiver<Delivery> {
        self.incoming.subscribe()
    }
}

pub fn ip(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

/// Addresses of a router with interfaces on 2001:db8:1::/64 and
/// 2001:db8:2::/64.
pub fn two_interface_addrs() -> Vec<Ipv6Addr> {
    vec![ip("2001:db8:1::1"), ip("2001:db8:2::1")]
}
