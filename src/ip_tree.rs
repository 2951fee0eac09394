//! One nested interval map per address family behind a single
//! [`IntervalMap`] over [`IpInterval`] keys.

use crate::error::TreeError;
use crate::etree::{IntervalMap, NestedIntervalMap};
use crate::interval::{IpInterval, Ipv4Interval, Ipv6Interval};

/// Protocol-independent interval tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpTree<V> {
    ipv4: NestedIntervalMap<Ipv4Interval, V>,
    ipv6: NestedIntervalMap<Ipv6Interval, V>,
}

impl<V> IpTree<V> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            ipv4: NestedIntervalMap::new(),
            ipv6: NestedIntervalMap::new(),
        }
    }

    /// Number of stored intervals across both families
    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    /// Whether both families are empty
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// The IPv4 tree
    pub fn ipv4(&self) -> &NestedIntervalMap<Ipv4Interval, V> {
        &self.ipv4
    }

    /// The IPv6 tree
    pub fn ipv6(&self) -> &NestedIntervalMap<Ipv6Interval, V> {
        &self.ipv6
    }
}

impl<V> Default for IpTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntervalMap<IpInterval, V> for IpTree<V> {
    fn put(&mut self, key: IpInterval, value: V) -> Result<Option<V>, TreeError<IpInterval>> {
        match key {
            IpInterval::V4(key) => self
                .ipv4
                .put(key, value)
                .map_err(|err| err.map_interval(IpInterval::from)),
            IpInterval::V6(key) => self
                .ipv6
                .put(key, value)
                .map_err(|err| err.map_interval(IpInterval::from)),
        }
    }

    fn remove(&mut self, key: &IpInterval) -> Option<V> {
        match key {
            IpInterval::V4(key) => self.ipv4.remove(key),
            IpInterval::V6(key) => self.ipv6.remove(key),
        }
    }

    fn remove_with_value(&mut self, key: &IpInterval, value: &V) -> Option<V>
    where
        V: PartialEq,
    {
        match key {
            IpInterval::V4(key) => self.ipv4.remove_with_value(key, value),
            IpInterval::V6(key) => self.ipv6.remove_with_value(key, value),
        }
    }

    fn clear(&mut self) {
        self.ipv4.clear();
        self.ipv6.clear();
    }

    fn find_exact(&self, key: &IpInterval) -> Option<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_exact(key),
            IpInterval::V6(key) => self.ipv6.find_exact(key),
        }
    }

    fn find_first_less_specific(&self, key: &IpInterval) -> Option<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_first_less_specific(key),
            IpInterval::V6(key) => self.ipv6.find_first_less_specific(key),
        }
    }

    fn find_exact_or_first_less_specific(&self, key: &IpInterval) -> Option<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_exact_or_first_less_specific(key),
            IpInterval::V6(key) => self.ipv6.find_exact_or_first_less_specific(key),
        }
    }

    fn find_all_less_specific(&self, key: &IpInterval) -> Vec<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_all_less_specific(key),
            IpInterval::V6(key) => self.ipv6.find_all_less_specific(key),
        }
    }

    fn find_exact_and_all_less_specific(&self, key: &IpInterval) -> Vec<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_exact_and_all_less_specific(key),
            IpInterval::V6(key) => self.ipv6.find_exact_and_all_less_specific(key),
        }
    }

    fn find_first_more_specific(&self, key: &IpInterval) -> Vec<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_first_more_specific(key),
            IpInterval::V6(key) => self.ipv6.find_first_more_specific(key),
        }
    }

    fn find_all_more_specific(&self, key: &IpInterval) -> Vec<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_all_more_specific(key),
            IpInterval::V6(key) => self.ipv6.find_all_more_specific(key),
        }
    }

    fn find_exact_and_all_more_specific(&self, key: &IpInterval) -> Vec<&V> {
        match key {
            IpInterval::V4(key) => self.ipv4.find_exact_and_all_more_specific(key),
            IpInterval::V6(key) => self.ipv6.find_exact_and_all_more_specific(key),
        }
    }
}
