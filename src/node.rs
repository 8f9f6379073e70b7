use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, RouterConfig};
use crate::link::{slip, Delivery, Transport};
use crate::protocol::advert::{self, Entry};
use crate::protocol::ipv6;
use crate::route::{periodic_advertisement, RoutingTable, UpdateOutcome};
use crate::router::Router;
use crate::send::SendScheduler;

/// Largest table whose advertisement still fits in one frame.
pub const MAX_ADVERTISED_ROUTES: usize =
    (slip::MAX_SEND - ipv6::HEADER_LEN - advert::HEADER_LEN) / Entry::serialized_size();

pub struct NodeBuilder {
    transport: Arc<dyn Transport>,
    config: RouterConfig,
}

impl NodeBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: RouterConfig) -> Self {
        Self { transport, config }
    }

    /// Set the number of routes the table can hold.
    pub fn with_capacity(&mut self, capacity: usize) -> &mut Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the interval between advertisements.
    pub fn with_advertise_interval(&mut self, interval: Duration) -> &mut Self {
        self.config.advertise_interval = interval;
        self
    }

    /// Set the maximum time a learned route lives without being refreshed.
    pub fn with_route_max_age(&mut self, max_age: Duration) -> &mut Self {
        self.config.route_max_age = max_age;
        self
    }

    /// Validate the configuration, install a direct route per interface and
    /// start advertising. Must be called within a tokio runtime.
    pub fn build(&self) -> Result<Node, ConfigError> {
        let config = self.config.clone();
        config.validate(self.transport.num_interfaces())?;

        if config.capacity > MAX_ADVERTISED_ROUTES {
            log::warn!(
                "A full table of {} routes will not fit in one advertisement (max {})",
                config.capacity,
                MAX_ADVERTISED_ROUTES
            );
        }

        let routes = Arc::new(RoutingTable::with_capacity(config.capacity));
        for (interface, addr) in config.addresses.iter().enumerate() {
            if routes.insert_direct(*addr, interface) == UpdateOutcome::Inserted {
                log::info!("Interface {}: {}", interface, addr);
            }
        }

        let scheduler = Arc::new(SendScheduler::new(self.transport.clone()));
        let router = Router::new(config.addresses.clone(), routes.clone(), scheduler.clone());

        let advertiser = tokio::spawn(periodic_advertisement(
            routes.clone(),
            scheduler.clone(),
            config.addresses.clone(),
            config.advertise_interval,
            config.route_max_age,
        ));

        Ok(Node {
            config,
            transport: self.transport.clone(),
            routes,
            scheduler,
            router,
            advertiser,
        })
    }
}

pub struct Node {
    config: RouterConfig,
    transport: Arc<dyn Transport>,
    routes: Arc<RoutingTable>,
    scheduler: Arc<SendScheduler>,
    router: Router,
    advertiser: JoinHandle<()>,
}

impl Node {
    /// Handle received packets until the transport shuts down.
    pub async fn run(&self) {
        let mut listener = self.transport.listen().await;
        loop {
            match listener.recv().await {
                Ok(Delivery { interface, bytes }) => {
                    self.router.handle_packet(interface, &bytes);
                }
                Err(RecvError::Lagged(n)) => {
                    log::warn!("Receive loop fell behind, {} packets lost", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    pub fn addresses(&self) -> &[Ipv6Addr] {
        &self.config.addresses
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn scheduler(&self) -> &SendScheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn is_my_addr(&self, addr: Ipv6Addr) -> bool {
        self.router.is_my_addr(addr)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.advertiser.abort();
    }
}
