//! Port allocation scenarios driven by a deterministic oracle, so no test
//! depends on what the host happens to have bound.

use multi_launch::orchestrator::{LaunchOrchestrator, OrchestratorSettings};
use multi_launch::port::{PortAllocator, PortOracle, PortRange, ReservedPorts};
use multi_launch::Error;
use proptest::prelude::*;
use std::collections::HashSet;

/// Pretends exactly `bound` is in use.
#[derive(Clone, Default)]
struct FixedOracle {
    bound: HashSet<u16>,
}

impl FixedOracle {
    fn with_bound(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            bound: ports.into_iter().collect(),
        }
    }
}

impl PortOracle for FixedOracle {
    fn is_bound(&self, port: u16) -> bool {
        self.bound.contains(&port)
    }

    fn snapshot_used_ports(&self, range: PortRange) -> HashSet<u16> {
        self.bound
            .iter()
            .copied()
            .filter(|p| range.contains(*p))
            .collect()
    }
}

fn allocator(low: u16, high: u16, oracle: FixedOracle) -> PortAllocator<FixedOracle> {
    PortAllocator::with_oracle(
        PortRange::new(low, high).unwrap(),
        ReservedPorts::default(),
        oracle,
    )
}

fn orchestrator(oracle: FixedOracle) -> LaunchOrchestrator<FixedOracle> {
    LaunchOrchestrator::new(allocator(8000, 9000, oracle), OrchestratorSettings::default())
}

#[test]
fn test_three_instances_get_spaced_ports() {
    let mut orch = orchestrator(FixedOracle::default());
    let ports: Vec<u16> = ["a", "b", "c"]
        .iter()
        .map(|n| orch.register_instance(n, "/bots", n, 8000).unwrap())
        .collect();
    assert_eq!(ports, vec![8000, 8010, 8020]);
}

#[test]
fn test_occupied_preferred_port_scans_upward_not_from_base() {
    let mut orch = orchestrator(FixedOracle::with_bound([8010]));
    let ports: Vec<u16> = ["a", "b", "c"]
        .iter()
        .map(|n| orch.register_instance(n, "/bots", n, 8000).unwrap())
        .collect();
    assert_eq!(ports, vec![8000, 8011, 8020]);
}

#[test]
fn test_free_preferred_port_is_returned_exactly() {
    let mut alloc = allocator(8000, 9000, FixedOracle::with_bound([8000, 8001]));
    assert_eq!(alloc.allocate(Some(8500), 0).unwrap(), 8500);
}

#[test]
fn test_reserved_preferred_port_is_skipped() {
    let mut alloc = allocator(8000, 9000, FixedOracle::default());
    assert_eq!(alloc.allocate(Some(8080), 0).unwrap(), 8081);
}

#[test]
fn test_batch_matches_registration_spacing() {
    let mut alloc = allocator(8000, 9000, FixedOracle::default());
    assert_eq!(alloc.allocate_batch(3, 8000).unwrap(), vec![8000, 8010, 8020]);
}

#[test]
fn test_fully_occupied_range_is_exhausted_with_index() {
    let mut alloc = allocator(8000, 8005, FixedOracle::with_bound(8000..=8005));
    let err = alloc.allocate_batch(2, 8000).unwrap_err();
    match err {
        Error::PortExhausted { index, low, high } => {
            assert_eq!(index, Some(0));
            assert_eq!((low, high), (8000, 8005));
        }
        other => panic!("expected PortExhausted, got {other:?}"),
    }
    assert!(alloc.allocated_ports().is_empty());
}

#[test]
fn test_released_port_can_be_allocated_again() {
    let mut alloc = allocator(8000, 9000, FixedOracle::default());
    let first = alloc.allocate(Some(8000), 0).unwrap();
    assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8001);
    assert!(alloc.release(first));
    assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8000);
}

proptest! {
    #[test]
    fn prop_batch_ports_are_unique_and_unreserved(
        count in 1usize..40,
        base in 7990u16..8600,
        bound in proptest::collection::hash_set(8000u16..8400, 0..200),
    ) {
        let mut alloc = allocator(8000, 9000, FixedOracle { bound: bound.clone() });
        let reserved = ReservedPorts::default();
        let ports = alloc.allocate_batch(count, base).unwrap();

        prop_assert_eq!(ports.len(), count);
        let distinct: HashSet<u16> = ports.iter().copied().collect();
        prop_assert_eq!(distinct.len(), count);
        for port in &ports {
            prop_assert!(!reserved.contains(*port));
            prop_assert!(!bound.contains(port));
        }
    }
}
