use std::net::Ipv6Addr;
use std::time::Duration;

use crate::route::DEFAULT_CAPACITY;

/// Most interfaces a router may be configured with.
pub const MAX_INTERFACES: usize = 100;

pub const DEFAULT_ADVERTISE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ROUTE_MAX_AGE: Duration = Duration::from_secs(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// One address per interface, in interface order.
    pub addresses: Vec<Ipv6Addr>,
    pub capacity: usize,
    pub advertise_interval: Duration,
    pub route_max_age: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            capacity: DEFAULT_CAPACITY,
            advertise_interval: DEFAULT_ADVERTISE_INTERVAL,
            route_max_age: DEFAULT_ROUTE_MAX_AGE,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no interface addresses given")]
    NoAddresses,
    #[error("{addresses} addresses given for {interfaces} interfaces")]
    InterfaceCountMismatch { interfaces: usize, addresses: usize },
    #[error("routing table capacity must be at least 1")]
    ZeroCapacity,
    #[error("{0} addresses given, at most {MAX_INTERFACES} supported")]
    TooManyAddresses(usize),
}

impl RouterConfig {
    pub fn new(addresses: Vec<Ipv6Addr>) -> Self {
        Self {
            addresses,
            ..Self::default()
        }
    }

    /// Check the configuration against a transport offering
    /// `num_interfaces` interfaces.
    pub fn validate(&self, num_interfaces: usize) -> Result<(), ConfigError> {
        if self.addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }
        if self.addresses.len() > MAX_INTERFACES {
            return Err(ConfigError::TooManyAddresses(self.addresses.len()));
        }
        if self.addresses.len() != num_interfaces {
            return Err(ConfigError::InterfaceCountMismatch {
                interfaces: num_interfaces,
                addresses: self.addresses.len(),
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}
