use std::net::Ipv6Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{RouterConfig, DEFAULT_ADVERTISE_INTERVAL, DEFAULT_ROUTE_MAX_AGE};
use crate::link::sim::DEFAULT_BAUD;
use crate::route::DEFAULT_CAPACITY;

/// Input to a router: its interface addresses and how its links are
/// simulated.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "slip6")]
#[command(about = "An IPv6 distance-vector router over simulated serial lines")]
pub struct Args {
    /// One address per interface, in simconfig tty order
    #[arg(required = true, value_name = "IPV6-ADDR")]
    pub addresses: Vec<Ipv6Addr>,

    /// File describing the simulated serial lines
    #[arg(short, long, default_value = "simconfig")]
    pub simconfig: PathBuf,

    /// Number of routes the routing table can hold
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Seconds between route advertisements
    #[arg(short, long, default_value_t = DEFAULT_ADVERTISE_INTERVAL.as_secs())]
    pub interval: u64,

    /// Seconds a learned route lives without being refreshed
    #[arg(long, default_value_t = DEFAULT_ROUTE_MAX_AGE.as_secs())]
    pub max_age: u64,

    /// Line rate of the simulated serial ports; 0 disables pacing
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Do not start the interactive console
    #[arg(long)]
    pub no_console: bool,
}

impl Args {
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            addresses: self.addresses.clone(),
            capacity: self.capacity,
            advertise_interval: Duration::from_secs(self.interval),
            route_max_age: Duration::from_secs(self.max_age),
        }
    }
}
