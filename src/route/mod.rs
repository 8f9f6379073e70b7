mod advertise;
mod table;

pub use advertise::{advertise_once, build_advertisement, periodic_advertisement};
pub use table::{Route, RoutingTable, UpdateOutcome, DEFAULT_CAPACITY};
