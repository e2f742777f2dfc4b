use super::{PortOracle, SystemPortOracle};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Spacing between preferred ports of consecutive batch members.
///
/// Services that auto-increment their own port by one would collide with
/// `base + i`; ten keeps neighbours out of each other's way.
pub const BATCH_PORT_STRIDE: u16 = 10;

/// Inclusive pool `[low, high]` that instance ports are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPortRange")]
pub struct PortRange {
    low: u16,
    high: u16,
}

#[derive(Deserialize)]
struct RawPortRange {
    low: u16,
    high: u16,
}

impl TryFrom<RawPortRange> for PortRange {
    type Error = Error;

    fn try_from(raw: RawPortRange) -> Result<Self> {
        PortRange::new(raw.low, raw.high)
    }
}

impl PortRange {
    pub fn new(low: u16, high: u16) -> Result<Self> {
        if low == 0 || low > high {
            return Err(Error::InvalidPortRange { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.low..=self.high).contains(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.low..=self.high
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            low: 8000,
            high: 9000,
        }
    }
}

/// Well-known ports that are never handed out, bound or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPorts(HashSet<u16>);

impl ReservedPorts {
    /// SSH, HTTP(S), MySQL, PostgreSQL, Redis, MongoDB and the usual 8080.
    pub const WELL_KNOWN: [u16; 8] = [22, 80, 443, 3306, 5432, 6379, 27017, 8080];

    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self(ports.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn with_extra(mut self, extra: impl IntoIterator<Item = u16>) -> Self {
        self.0.extend(extra);
        self
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }
}

impl Default for ReservedPorts {
    fn default() -> Self {
        Self::new(Self::WELL_KNOWN)
    }
}

/// Hands out ports that are unique for the lifetime of the allocator.
///
/// Every call refreshes the host snapshot first, so a port freed or taken
/// between two calls is seen by the second. Ports already handed out stay
/// unusable until [`PortAllocator::release`] is called; that is what keeps
/// successive instances distinct even before any of them has bound.
pub struct PortAllocator<O = SystemPortOracle> {
    range: PortRange,
    reserved: ReservedPorts,
    oracle: O,
    /// Host snapshot taken by the most recent allocation
    used: HashSet<u16>,
    /// Ports handed out and not yet released
    allocated: HashSet<u16>,
}

impl PortAllocator<SystemPortOracle> {
    pub fn new(range: PortRange) -> Self {
        Self::with_oracle(range, ReservedPorts::default(), SystemPortOracle::new())
    }
}

impl<O: PortOracle> PortAllocator<O> {
    pub fn with_oracle(range: PortRange, reserved: ReservedPorts, oracle: O) -> Self {
        Self {
            range,
            reserved,
            oracle,
            used: HashSet::new(),
            allocated: HashSet::new(),
        }
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Snapshot of host ports taken by the last allocation.
    pub fn used_ports(&self) -> &HashSet<u16> {
        &self.used
    }

    /// Ports handed out and not yet released, ascending.
    pub fn allocated_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.allocated.iter().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Return a port to the pool. Returns false if it was not handed out here.
    pub fn release(&mut self, port: u16) -> bool {
        self.allocated.remove(&port)
    }

    /// Allocate one port.
    ///
    /// Order of preference:
    /// 1. `preferred` itself, if usable
    /// 2. the first usable port above `preferred`, up to the range ceiling
    /// 3. the first usable port from `range.low + offset` up to the ceiling
    pub fn allocate(&mut self, preferred: Option<u16>, offset: u16) -> Result<u16> {
        self.refresh();

        if let Some(preferred) = preferred {
            if self.is_usable(preferred) {
                return Ok(self.take(preferred));
            }
            tracing::debug!(
                "Preferred port {} unavailable, scanning upward to {}",
                preferred,
                self.range.high
            );
            if let Some(start) = preferred.checked_add(1) {
                if let Some(port) = self.scan_from(start) {
                    return Ok(self.take(port));
                }
            }
        }

        if let Some(start) = self.range.low.checked_add(offset) {
            if let Some(port) = self.scan_from(start) {
                return Ok(self.take(port));
            }
        }

        Err(Error::PortExhausted {
            index: None,
            low: self.range.low,
            high: self.range.high,
        })
    }

    /// Allocate `count` ports at `base_port + i * 10`, falling back per [`allocate`].
    ///
    /// All or nothing: on failure every port taken by this call is released
    /// and the error carries the index that could not be served.
    ///
    /// [`allocate`]: PortAllocator::allocate
    pub fn allocate_batch(&mut self, count: usize, base_port: u16) -> Result<Vec<u16>> {
        let mut ports = Vec::with_capacity(count);

        for index in 0..count {
            let preferred = preferred_port_for(base_port, index);
            let offset = u16::try_from(index).unwrap_or(u16::MAX);

            match self.allocate(preferred, offset) {
                Ok(port) => ports.push(port),
                Err(Error::PortExhausted { low, high, .. }) => {
                    for port in &ports {
                        self.release(*port);
                    }
                    tracing::warn!(
                        "Batch allocation failed at index {} of {}, released {} port(s)",
                        index,
                        count,
                        ports.len()
                    );
                    return Err(Error::PortExhausted {
                        index: Some(index),
                        low,
                        high,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ports)
    }

    fn refresh(&mut self) {
        self.used = self.oracle.snapshot_used_ports(self.range);
    }

    fn scan_from(&self, start: u16) -> Option<u16> {
        if start > self.range.high {
            return None;
        }
        (start..=self.range.high).find(|&port| self.is_usable(port))
    }

    /// Reserved, snapshotted and handed-out ports are skipped without a probe;
    /// the live probe catches anything opened after the snapshot.
    fn is_usable(&self, port: u16) -> bool {
        port != 0
            && !self.reserved.contains(port)
            && !self.used.contains(&port)
            && !self.allocated.contains(&port)
            && !self.oracle.is_bound(port)
    }

    fn take(&mut self, port: u16) -> u16 {
        self.allocated.insert(port);
        tracing::debug!("Allocated port {}", port);
        port
    }
}

/// `base + index * stride`, or `None` past the top of the port space.
pub(crate) fn preferred_port_for(base_port: u16, index: usize) -> Option<u16> {
    let step = u32::try_from(index)
        .ok()?
        .checked_mul(u32::from(BATCH_PORT_STRIDE))?;
    u16::try_from(u32::from(base_port).checked_add(step)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;

    /// Oracle with a fixed set of bound ports; `hidden` ports are bound but
    /// missing from the snapshot, as if opened right after enumeration.
    #[derive(Default)]
    struct FakeOracle {
        bound: HashSet<u16>,
        hidden: HashSet<u16>,
        probes: RefCell<Vec<u16>>,
    }

    impl FakeOracle {
        fn bound(ports: impl IntoIterator<Item = u16>) -> Self {
            Self {
                bound: ports.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl PortOracle for FakeOracle {
        fn is_bound(&self, port: u16) -> bool {
            self.probes.borrow_mut().push(port);
            self.bound.contains(&port) || self.hidden.contains(&port)
        }

        fn snapshot_used_ports(&self, _range: PortRange) -> HashSet<u16> {
            self.bound.clone()
        }
    }

    fn allocator(low: u16, high: u16, oracle: FakeOracle) -> PortAllocator<FakeOracle> {
        PortAllocator::with_oracle(
            PortRange::new(low, high).unwrap(),
            ReservedPorts::default(),
            oracle,
        )
    }

    #[test]
    fn range_rejects_inverted_and_zero() {
        assert!(PortRange::new(9000, 8000).is_err());
        assert!(PortRange::new(0, 10).is_err());
        let single = PortRange::new(5, 5).unwrap();
        assert!(single.contains(5));
        assert_eq!(single.iter().count(), 1);
    }

    #[test]
    fn range_deserializes_with_validation() {
        let ok: PortRange = serde_json::from_str(r#"{"low": 8000, "high": 8100}"#).unwrap();
        assert_eq!((ok.low(), ok.high()), (8000, 8100));
        assert!(serde_json::from_str::<PortRange>(r#"{"low": 10, "high": 1}"#).is_err());
    }

    #[test]
    fn free_preferred_port_is_returned_exactly() {
        let mut alloc = allocator(8000, 9000, FakeOracle::default());
        assert_eq!(alloc.allocate(Some(8500), 0).unwrap(), 8500);
    }

    #[test]
    fn occupied_preferred_port_scans_upward() {
        let mut alloc = allocator(8000, 9000, FakeOracle::bound([8500, 8501]));
        assert_eq!(alloc.allocate(Some(8500), 0).unwrap(), 8502);
    }

    #[test]
    fn reserved_preferred_port_is_skipped() {
        let mut alloc = allocator(8000, 9000, FakeOracle::default());
        assert_eq!(alloc.allocate(Some(8080), 0).unwrap(), 8081);
    }

    #[test]
    fn no_preference_starts_at_low_plus_offset() {
        let mut alloc = allocator(8000, 9000, FakeOracle::default());
        assert_eq!(alloc.allocate(None, 3).unwrap(), 8003);
    }

    #[test]
    fn upward_scan_exhaustion_falls_back_to_offset_scan() {
        let oracle = FakeOracle::bound(8005..=8010);
        let mut alloc = allocator(8000, 8010, oracle);
        assert_eq!(alloc.allocate(Some(8005), 1).unwrap(), 8001);
    }

    #[test]
    fn fully_occupied_range_is_exhausted() {
        let oracle = FakeOracle::bound(8000..=8010);
        let mut alloc = allocator(8000, 8010, oracle);
        let err = alloc.allocate(Some(8000), 0).unwrap_err();
        assert!(matches!(
            err,
            Error::PortExhausted {
                index: None,
                low: 8000,
                high: 8010
            }
        ));
    }

    #[test]
    fn scans_never_pass_the_ceiling() {
        let mut alloc = allocator(8000, 8002, FakeOracle::bound([8002]));
        assert_eq!(alloc.allocate(Some(8002), 0).unwrap(), 8000);
        assert_eq!(alloc.allocate(Some(8002), 0).unwrap(), 8001);
        assert!(alloc.allocate(Some(8002), 0).is_err());
    }

    #[test]
    fn usable_preferred_port_outside_range_is_honored() {
        let mut alloc = allocator(8000, 8002, FakeOracle::default());
        assert_eq!(alloc.allocate(Some(9500), 0).unwrap(), 9500);
    }

    #[test]
    fn occupied_preferred_port_above_ceiling_uses_offset_scan() {
        let mut alloc = allocator(8000, 8002, FakeOracle::bound([9500]));
        assert_eq!(alloc.allocate(Some(9500), 1).unwrap(), 8001);
    }

    #[test]
    fn port_bound_after_snapshot_is_caught_by_live_probe() {
        let oracle = FakeOracle {
            hidden: [8000].into_iter().collect(),
            ..Default::default()
        };
        let mut alloc = allocator(8000, 9000, oracle);
        assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8001);
        assert!(alloc.oracle().probes.borrow().contains(&8000));
    }

    #[test]
    fn handed_out_ports_are_not_reused_until_released() {
        let mut alloc = allocator(8000, 9000, FakeOracle::default());
        assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8000);
        assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8001);

        assert!(alloc.release(8000));
        assert!(!alloc.release(8000));
        assert_eq!(alloc.allocate(Some(8000), 0).unwrap(), 8000);
        assert_eq!(alloc.allocated_ports(), vec![8000, 8001]);
    }

    #[test]
    fn batch_uses_stride_of_ten() {
        let mut alloc = allocator(8000, 9000, FakeOracle::default());
        assert_eq!(alloc.allocate_batch(3, 8000).unwrap(), vec![8000, 8010, 8020]);
    }

    #[test]
    fn batch_scans_up_from_occupied_member_not_from_base() {
        let mut alloc = allocator(8000, 9000, FakeOracle::bound([8010]));
        assert_eq!(alloc.allocate_batch(3, 8000).unwrap(), vec![8000, 8011, 8020]);
    }

    #[test]
    fn batch_failure_reports_index_and_releases_partial_ports() {
        // Three ports in range, 8002 and the preferred ports above it bound
        let mut alloc = allocator(8000, 8002, FakeOracle::bound([8002, 8010, 8020]));
        let err = alloc.allocate_batch(3, 8000).unwrap_err();
        assert!(matches!(err, Error::PortExhausted { index: Some(2), .. }));
        assert!(alloc.allocated_ports().is_empty());
    }

    #[test]
    fn preferred_port_overflow_is_none() {
        assert_eq!(preferred_port_for(8000, 2), Some(8020));
        assert_eq!(preferred_port_for(65530, 1), None);
    }

    proptest! {
        #[test]
        fn batch_ports_are_distinct_and_unreserved(
            count in 1usize..20,
            base in 7990u16..8100,
            bound in prop::collection::hash_set(8000u16..8300, 0..40),
        ) {
            let mut alloc = allocator(8000, 8400, FakeOracle::bound(bound.clone()));
            let ports = alloc.allocate_batch(count, base).unwrap();

            let unique: HashSet<u16> = ports.iter().copied().collect();
            prop_assert_eq!(unique.len(), ports.len());
            for port in &ports {
                prop_assert!(!ReservedPorts::default().contains(*port));
                prop_assert!(!bound.contains(port));
            }
        }
    }
}
