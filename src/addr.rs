//! Prefix and address helpers.
//!
//! Every network is a fixed-width /64: the first 8 octets of an address name
//! the network, the remaining 8 name the host.

use std::net::Ipv6Addr;

/// Number of leading octets that make up a network prefix.
pub const PREFIX_OCTETS: usize = 8;

/// Link-local all-nodes multicast, `ff02::1`.
pub const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// The network prefix of `addr`, with all host bits cleared.
pub fn network_prefix(addr: Ipv6Addr) -> Ipv6Addr {
    let mut octets = addr.octets();
    octets[PREFIX_OCTETS..].fill(0);
    Ipv6Addr::from(octets)
}

/// Whether two addresses lie in the same network.
pub fn same_network(a: Ipv6Addr, b: Ipv6Addr) -> bool {
    a.octets()[..PREFIX_OCTETS] == b.octets()[..PREFIX_OCTETS]
}

pub fn is_all_nodes(addr: Ipv6Addr) -> bool {
    addr == ALL_NODES
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    #[test]
    fn prefix_clears_host_bits_only() {
        let mut rng = thread_rng();
        for _ in 0..1000 {
            let addr = Ipv6Addr::from(rng.gen::<u128>());
            let prefix = network_prefix(addr);

            assert_eq!(&prefix.octets()[..PREFIX_OCTETS], &addr.octets()[..PREFIX_OCTETS]);
            assert!(prefix.octets()[PREFIX_OCTETS..].iter().all(|b| *b == 0));
            assert!(same_network(addr, prefix));
        }
    }

    #[test]
    fn prefix_of_documentation_address() {
        let addr: Ipv6Addr = "2001:db8:3::42".parse().unwrap();
        assert_eq!(network_prefix(addr), "2001:db8:3::".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn networks_differ_in_the_fourth_group() {
        let a: Ipv6Addr = "2001:db8:1:1::1".parse().unwrap();
        let b: Ipv6Addr = "2001:db8:1:2::1".parse().unwrap();
        let c: Ipv6Addr = "2001:db8:1:1:ffff::9".parse().unwrap();

        assert!(!same_network(a, b));
        assert!(same_network(a, c));
    }

    #[test]
    fn all_nodes_multicast() {
        assert!(is_all_nodes("ff02::1".parse().unwrap()));
        assert!(!is_all_nodes("ff02::2".parse().unwrap()));
        assert!(!is_all_nodes("2001:db8::1".parse().unwrap()));
    }
}
