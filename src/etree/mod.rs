//! Nested interval tree engine
//!
//! Intervals are kept in a forest where every interval is either disjoint
//! from or nested inside every other interval at its level. Each node owns
//! its children outright; all traversals run top-down, so there are no parent
//! pointers.
//!
//! The engine performs no internal synchronization. Read-only queries may run
//! from several threads while no writer is active; writers must be serialized
//! by the caller, or work on a [`Clone`] of the map.

pub mod child_map;
pub mod nested;
pub mod node;


pub use child_map::{ChildNodeMap, ChildNodeTreeMap};
pub use nested::NestedIntervalMap;
pub use node::InternalNode;

use crate::error::TreeError;

/// Containment queries and mutations over interval keys.
///
/// "Less specific" intervals contain the key, "more specific" intervals are
/// contained by it. Multi-valued results from the less specific family are
/// ordered outermost first; the more specific family returns values in the
/// keys' canonical order.
pub trait IntervalMap<K, V> {
    /// Insert or replace `key`. Fails if `key` partially overlaps an existing
    /// sibling, in which case the map is left unchanged.
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, TreeError<K>>;

    /// Remove `key` if present, promoting its children to its parent
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Remove `key` only if it currently maps to `value`
    fn remove_with_value(&mut self, key: &K, value: &V) -> Option<V>
    where
        V: PartialEq;

    /// Remove everything
    fn clear(&mut self);

    /// The value stored for exactly `key`
    fn find_exact(&self, key: &K) -> Option<&V>;

    /// The value of the nearest interval strictly containing `key`
    fn find_first_less_specific(&self, key: &K) -> Option<&V>;

    /// [`IntervalMap::find_exact`], falling back to
    /// [`IntervalMap::find_first_less_specific`]
    fn find_exact_or_first_less_specific(&self, key: &K) -> Option<&V>;

    /// Values of every interval strictly containing `key`
    fn find_all_less_specific(&self, key: &K) -> Vec<&V>;

    /// Values of every interval containing `key`, including an exact match
    fn find_exact_and_all_less_specific(&self, key: &K) -> Vec<&V>;

    /// Values of the outermost intervals strictly inside `key`
    fn find_first_more_specific(&self, key: &K) -> Vec<&V>;

    /// Values of every interval strictly inside `key`
    fn find_all_more_specific(&self, key: &K) -> Vec<&V>;

    /// Values of every interval inside `key`, including an exact match
    fn find_exact_and_all_more_specific(&self, key: &K) -> Vec<&V>;
}
