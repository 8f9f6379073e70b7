use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use crate::addr::ALL_NODES;
use crate::protocol::advert::Advertisement;
use crate::protocol::ipv6::{BuildError, Ipv6PacketBuilder};
use crate::protocol::Protocol;
use crate::send::SendScheduler;
use crate::utils::loop_with_interval;
use crate::Message;

use super::{Route, RoutingTable};

/// Advertisements never leave the link they are sent on.
pub const ADVERTISEMENT_HOP_LIMIT: u8 = 1;

/// A complete advertisement packet from `sender` to all nodes on the link.
pub fn build_advertisement(sender: Ipv6Addr, routes: &[Route]) -> Result<Vec<u8>, BuildError> {
    let payload = Advertisement::from_routes(sender, routes).into_bytes();
    Ipv6PacketBuilder::default()
        .with_payload(&payload)
        .with_next_header(Protocol::Routing)
        .with_hop_limit(ADVERTISEMENT_HOP_LIMIT)
        .with_src(sender)
        .with_dst(ALL_NODES)
        .build()
}

/// One advertisement cycle: expire stale routes, then submit the remaining
/// table on every interface, sourced from that interface's address.
///
/// Every interface gets the same snapshot. Returns the number of
/// advertisements accepted by the scheduler.
pub fn advertise_once(
    routes: &RoutingTable,
    scheduler: &SendScheduler,
    addrs: &[Ipv6Addr],
    max_age: Duration,
) -> usize {
    let expired = routes.age_sweep(max_age);
    if expired > 0 {
        log::info!("Expired {} routes", expired);
    }

    let snapshot = routes.snapshot();
    let mut submitted = 0;
    for (interface, addr) in addrs.iter().enumerate() {
        let packet = match build_advertisement(*addr, &snapshot) {
            Ok(packet) => packet,
            Err(e) => {
                log::error!("Failed to build advertisement for {}: {}", addr, e);
                continue;
            }
        };
        log::debug!(
            "Advertising {} routes on interface {}",
            snapshot.len(),
            interface
        );
        match scheduler.submit(interface, packet) {
            Ok(_) => submitted += 1,
            Err(e) => log::warn!("Advertisement on interface {} not sent: {}", interface, e),
        }
    }
    submitted
}

pub async fn periodic_advertisement(
    routes: Arc<RoutingTable>,
    scheduler: Arc<SendScheduler>,
    addrs: Vec<Ipv6Addr>,
    interval: Duration,
    max_age: Duration,
) {
    loop_with_interval(interval, || async {
        advertise_once(&routes, &scheduler, &addrs, max_age);
    })
    .await;
}
