use core::fmt;
use std::{
    net::Ipv6Addr,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::addr::{network_prefix, same_network};

/// Default number of routes a table can hold.
pub const DEFAULT_CAPACITY: usize = 29;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Route {
    prefix: Ipv6Addr,
    next_hop: Ipv6Addr,
    metric: u32,
    is_direct: bool,
    interface: usize,
    last_refresh: Instant,
}

impl Route {
    pub fn new(
        dest: Ipv6Addr,
        next_hop: Ipv6Addr,
        metric: u32,
        interface: usize,
        now: Instant,
    ) -> Self {
        Self {
            prefix: network_prefix(dest),
            next_hop,
            metric,
            is_direct: false,
            interface,
            last_refresh: now,
        }
    }

    /// A route to the network of one of the router's own interfaces.
    pub fn new_direct(addr: Ipv6Addr, interface: usize, now: Instant) -> Self {
        Self {
            prefix: network_prefix(addr),
            next_hop: addr,
            metric: 0,
            is_direct: true,
            interface,
            last_refresh: now,
        }
    }

    pub fn prefix(&self) -> Ipv6Addr {
        self.prefix
    }

    pub fn next_hop(&self) -> Ipv6Addr {
        self.next_hop
    }

    pub fn metric(&self) -> u32 {
        self.metric
    }

    /// Whether this route was configured locally rather than learned.
    pub fn is_direct(&self) -> bool {
        self.is_direct
    }

    /// Index of the interface packets for this prefix leave on.
    pub fn interface(&self) -> usize {
        self.interface
    }

    pub fn last_refresh(&self) -> Instant {
        self.last_refresh
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refresh)
    }

    fn replace(&mut self, next_hop: Ipv6Addr, metric: u32, interface: usize, now: Instant) {
        log::info!(
            "Replace route: old: {}, new next hop: {}, new metric: {}",
            self,
            next_hop,
            metric
        );
        self.next_hop = next_hop;
        self.metric = metric;
        self.interface = interface;
        self.last_refresh = now;
    }

    fn refresh(&mut self, now: Instant) {
        log::debug!("Refreshing route: {}", self);
        self.last_refresh = now;
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = if self.is_direct { "direct" } else { "learned" };
        write!(
            f,
            "{}/64\t{}\t{}\t{}\t{}",
            self.prefix, self.next_hop, self.metric, kind, self.interface
        )
    }
}

/// What an update did to the table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A route for a previously unknown prefix was added.
    Inserted,
    /// A strictly better route took over the prefix.
    Replaced,
    /// The current route was re-advertised at the same metric by its own
    /// next hop; only its refresh time moved.
    Refreshed,
    /// The table already holds a route at least as good, or a direct route.
    Ignored,
    /// The prefix is new and the table is at capacity.
    TableFull,
}

/// The unsynchronized route store. All access goes through [`RoutingTable`].
#[derive(Debug)]
pub(crate) struct RouteTable {
    routes: Vec<Route>,
    capacity: usize,
}

impl RouteTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn find_mut(&mut self, prefix: Ipv6Addr) -> Option<&mut Route> {
        self.routes
            .iter_mut()
            .find(|r| same_network(r.prefix, prefix))
    }

    pub(crate) fn find(&self, addr: Ipv6Addr) -> Option<&Route> {
        self.routes.iter().find(|r| same_network(r.prefix, addr))
    }

    pub(crate) fn update(&mut self, candidate: Route) -> UpdateOutcome {
        let capacity = self.capacity;
        let len = self.routes.len();

        match self.find_mut(candidate.prefix) {
            Some(found) if candidate.is_direct => {
                if found.is_direct {
                    return UpdateOutcome::Ignored;
                }
                log::info!("Direct route overrides learned route {}", found);
                *found = candidate;
                UpdateOutcome::Replaced
            }
            Some(found) if found.is_direct => {
                log::debug!(
                    "Not updating direct route {} from {}",
                    found,
                    candidate.next_hop
                );
                UpdateOutcome::Ignored
            }
            Some(found) => {
                if candidate.metric < found.metric {
                    found.replace(
                        candidate.next_hop,
                        candidate.metric,
                        candidate.interface,
                        candidate.last_refresh,
                    );
                    UpdateOutcome::Replaced
                } else if candidate.metric == found.metric && candidate.next_hop == found.next_hop
                {
                    found.refresh(candidate.last_refresh);
                    UpdateOutcome::Refreshed
                } else {
                    log::debug!(
                        "Not updating route {}, offered metric {} via {} is no better",
                        found,
                        candidate.metric,
                        candidate.next_hop
                    );
                    UpdateOutcome::Ignored
                }
            }
            None if len < capacity => {
                log::info!("Adding route {}", candidate);
                self.routes.push(candidate);
                UpdateOutcome::Inserted
            }
            None => {
                log::warn!(
                    "Routing table full ({} routes), cannot add route to {}",
                    capacity,
                    candidate.prefix
                );
                UpdateOutcome::TableFull
            }
        }
    }

    pub(crate) fn age_sweep(&mut self, max_age: Duration, now: Instant) -> usize {
        for route in self.routes.iter() {
            if !route.is_direct && route.age(now) > max_age {
                log::warn!(
                    "Removing expired route {}, age: {:?}",
                    route,
                    route.age(now)
                );
            }
        }

        let len_before = self.routes.len();
        self.routes
            .retain(|r| r.is_direct || r.age(now) <= max_age);
        let num_deleted = len_before - self.routes.len();
        if num_deleted > 0 {
            log::info!("Table swept, {num_deleted} routes expired");
        }
        num_deleted
    }

    pub(crate) fn routes(&self) -> &[Route] {
        self.routes.as_slice()
    }
}

/// The router's table of best known routes, one per network prefix.
///
/// Every operation takes the same lock for the duration of a bounded
/// in-memory step, so readers never observe a half-applied update and no
/// lock is held across I/O. The lock is a plain (non-async) mutex: none of
/// the operations ever wait on the network.
#[derive(Debug)]
pub struct RoutingTable {
    inner: Mutex<RouteTable>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RoutingTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RouteTable::with_capacity(capacity)),
        }
    }

    /// Install the permanent, zero-metric route for a local interface.
    pub fn insert_direct(&self, addr: Ipv6Addr, interface: usize) -> UpdateOutcome {
        let route = Route::new_direct(addr, interface, Instant::now());
        let outcome = self.inner.lock().update(route);
        if outcome == UpdateOutcome::TableFull {
            log::error!("No room for direct route to {}", route.prefix());
        }
        outcome
    }

    /// Offer a route to the network of `dest` via `gateway`.
    ///
    /// Only the prefix of `dest` is stored. A learned route is replaced by a
    /// strictly lower metric, refreshed by an equal metric from the same
    /// gateway, and otherwise left alone. Direct routes are never replaced by
    /// learned ones.
    pub fn update(
        &self,
        dest: Ipv6Addr,
        gateway: Ipv6Addr,
        metric: u32,
        is_direct: bool,
        interface: usize,
    ) -> UpdateOutcome {
        let now = Instant::now();
        let route = if is_direct {
            Route {
                next_hop: gateway,
                ..Route::new_direct(dest, interface, now)
            }
        } else {
            Route::new(dest, gateway, metric, interface, now)
        };
        self.inner.lock().update(route)
    }

    /// Remove every learned route older than `max_age`. Returns how many were
    /// removed.
    pub fn age_sweep(&self, max_age: Duration) -> usize {
        self.inner.lock().age_sweep(max_age, Instant::now())
    }

    /// Copy of all routes as of a single instant.
    pub fn snapshot(&self) -> Vec<Route> {
        self.inner.lock().routes().to_vec()
    }

    /// The route for the network containing `addr`, if any.
    pub fn lookup(&self, addr: Ipv6Addr) -> Option<Route> {
        self.inner.lock().find(addr).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    #[cfg(test)]
    pub(crate) fn age_sweep_at(&self, max_age: Duration, now: Instant) -> usize {
        self.inner.lock().age_sweep(max_age, now)
    }
}
