use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rapid_coordinator::{adversaries_for, CommitteeAssigner};
use rapid_types::{Digest, PublicKey};

fn registered(n: usize) -> Vec<(PublicKey, SocketAddr)> {
    (0..n)
        .map(|i| {
            let mut key = [0u8; 32];
            key[..8].copy_from_slice(&(i as u64).to_le_bytes());
            (
                PublicKey(key),
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1024 + i as u16),
            )
        })
        .collect()
}

fn params() -> impl Strategy<Value = (usize, usize, u64)> {
    (1usize..=12).prop_flat_map(|m| (Just(m), m..=m * 20, any::<u64>()))
}

proptest! {
    #[test]
    fn every_node_lands_in_exactly_one_committee((m, n, seed) in params()) {
        let assigner = CommitteeAssigner::new(m, 3, 2).unwrap();
        let assignment = assigner.assign(registered(n), &mut StdRng::seed_from_u64(seed)).unwrap();

        prop_assert_eq!(assignment.nodes.len(), n);
        prop_assert_eq!(assignment.committees.len(), m);

        let mut keys: Vec<_> = assignment.nodes.iter().map(|node| node.public_key).collect();
        keys.sort_by_key(|k| k.0);
        keys.dedup();
        prop_assert_eq!(keys.len(), n);

        let mut sizes: HashMap<Digest, usize> = HashMap::new();
        for node in &assignment.nodes {
            *sizes.entry(node.committee_id).or_default() += 1;
        }
        prop_assert_eq!(sizes.len(), m);

        let npm = n / m;
        let odd: Vec<usize> = sizes.values().copied().filter(|&s| s != npm).collect();
        prop_assert!(odd.len() <= 1);
        if let Some(&s) = odd.first() {
            prop_assert_eq!(s, npm + n % m);
        }
    }

    #[test]
    fn adversaries_stay_below_committee_bound((m, n, seed) in params()) {
        let assigner = CommitteeAssigner::new(m, 3, 2).unwrap();
        let assignment = assigner.assign(registered(n), &mut StdRng::seed_from_u64(seed)).unwrap();
        for committee in &assignment.committees {
            prop_assert!(committee.adversaries < committee.size.div_ceil(2));
            prop_assert_eq!(committee.adversaries, committee.target);
        }
        if m % 2 == 0 && n / m > 1 {
            prop_assert!(assignment.total_adversaries() * 3 < n);
        }
    }

    #[test]
    fn adversaries_lead_their_committee((m, n, seed) in params()) {
        let assigner = CommitteeAssigner::new(m, 3, 2).unwrap();
        let assignment = assigner.assign(registered(n), &mut StdRng::seed_from_u64(seed)).unwrap();
        for committee in &assignment.committees {
            let flags: Vec<bool> = assignment.members_of(&committee.id).map(|n| n.honest).collect();
            let f = committee.adversaries;
            prop_assert!(flags[..f].iter().all(|h| !h));
            prop_assert!(flags[f..].iter().all(|h| *h));
        }
    }

    #[test]
    fn fixed_seed_is_deterministic((m, n, seed) in params()) {
        let assigner = CommitteeAssigner::new(m, 3, 2).unwrap();
        let a = assigner.assign(registered(n), &mut StdRng::seed_from_u64(seed)).unwrap();
        let b = assigner.assign(registered(n), &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn adversary_count_is_strictly_inside_the_bound(size in 1usize..500, divisor in 1usize..12) {
        let f = adversaries_for(size, divisor);
        prop_assert!(f < size.div_ceil(divisor).max(1));
    }
}
