//! The forwarding engine: what to do with each packet that arrives.

use std::net::Ipv6Addr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::addr::is_all_nodes;
use crate::protocol::advert::Advertisement;
use crate::protocol::ipv6::{self, Packet};
use crate::protocol::Protocol;
use crate::route::{RoutingTable, UpdateOutcome};
use crate::send::SendScheduler;
use crate::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("malformed packet")]
    Malformed,
    #[error("malformed advertisement")]
    MalformedAdvertisement,
    #[error("local packet with next header {0} is not routing protocol")]
    NotRouting(u8),
    #[error("hop limit exceeded")]
    HopLimitExceeded,
    #[error("no route")]
    NoRoute,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// An advertisement for this router was applied to the routing table.
    AdvertisementConsumed {
        sender: Ipv6Addr,
        entries: usize,
        changed: usize,
    },
    /// `packet`, with its hop limit already decremented, should leave on
    /// `interface`.
    Forward { interface: usize, packet: Vec<u8> },
    Dropped(DropReason),
}

pub struct Router {
    my_addrs: Vec<Ipv6Addr>,
    routes: Arc<RoutingTable>,
    scheduler: Arc<SendScheduler>,
}

impl Router {
    pub fn new(
        my_addrs: Vec<Ipv6Addr>,
        routes: Arc<RoutingTable>,
        scheduler: Arc<SendScheduler>,
    ) -> Self {
        Self {
            my_addrs,
            routes,
            scheduler,
        }
    }

    pub fn is_my_addr(&self, addr: Ipv6Addr) -> bool {
        self.my_addrs.contains(&addr)
    }

    /// Decide and act on a packet received on `interface`.
    ///
    /// Returns the handle of the send task when the packet was forwarded.
    pub fn handle_packet(&self, interface: usize, bytes: &[u8]) -> Option<JoinHandle<()>> {
        match self.decide_packet(interface, bytes) {
            Verdict::Forward {
                interface: egress,
                packet,
            } => match self.scheduler.submit(egress, packet) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::warn!("Forward on interface {} dropped: {}", egress, e);
                    None
                }
            },
            Verdict::AdvertisementConsumed { .. } | Verdict::Dropped(_) => None,
        }
    }

    /// Classify a packet received on `interface`.
    ///
    /// Advertisements are applied to the routing table here; nothing is
    /// sent.
    pub fn decide_packet(&self, interface: usize, bytes: &[u8]) -> Verdict {
        let packet = match Packet::parse(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("Dropping packet from interface {}: {}", interface, e);
                return Verdict::Dropped(DropReason::Malformed);
            }
        };

        let dst = packet.destination();
        if self.is_my_addr(dst) || is_all_nodes(dst) {
            return self.consume_packet(interface, &packet);
        }

        if packet.hop_limit() <= 1 {
            log::debug!(
                "Dropping packet {} -> {}: hop limit exceeded",
                packet.source(),
                dst
            );
            return Verdict::Dropped(DropReason::HopLimitExceeded);
        }

        let route = match self.routes.lookup(dst) {
            Some(route) => route,
            None => {
                log::debug!("Dropping packet {} -> {}: no route", packet.source(), dst);
                return Verdict::Dropped(DropReason::NoRoute);
            }
        };

        match ipv6::rewrite_hop_limit(bytes, packet.hop_limit() - 1) {
            Ok(forwarded) => {
                log::debug!(
                    "Forwarding packet to {} via {} on interface {}",
                    dst,
                    route.next_hop(),
                    route.interface()
                );
                Verdict::Forward {
                    interface: route.interface(),
                    packet: forwarded,
                }
            }
            Err(_) => Verdict::Dropped(DropReason::Malformed),
        }
    }

    fn consume_packet(&self, interface: usize, packet: &Packet) -> Verdict {
        if Protocol::try_from(packet.next_header()).is_err() {
            log::debug!(
                "Ignoring local packet from {} with next header {}",
                packet.source(),
                packet.next_header()
            );
            return Verdict::Dropped(DropReason::NotRouting(packet.next_header()));
        }

        let advert = match Advertisement::from_bytes(packet.payload()) {
            Ok(advert) => advert,
            Err(e) => {
                log::warn!(
                    "Bad advertisement from {} on interface {}: {}",
                    packet.source(),
                    interface,
                    e
                );
                return Verdict::Dropped(DropReason::MalformedAdvertisement);
            }
        };

        let mut changed = 0;
        for entry in advert.entries() {
            let outcome = self.routes.update(
                entry.prefix(),
                advert.sender(),
                entry.metric().saturating_add(1),
                false,
                interface,
            );
            match outcome {
                UpdateOutcome::Inserted | UpdateOutcome::Replaced => {
                    log::debug!(
                        "Route to {}/64 via {} metric {} ({:?})",
                        entry.prefix(),
                        advert.sender(),
                        entry.metric().saturating_add(1),
                        outcome
                    );
                    changed += 1;
                }
                UpdateOutcome::TableFull => {
                    log::warn!("Routing table full, no room for {}/64", entry.prefix())
                }
                UpdateOutcome::Refreshed | UpdateOutcome::Ignored => {}
            }
        }

        Verdict::AdvertisementConsumed {
            sender: advert.sender(),
            entries: advert.entries().len(),
            changed,
        }
    }
}
