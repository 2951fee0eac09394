//! Top-level nested interval map
//!
//! [`NestedIntervalMap`] owns one root sibling container holding any number
//! of independent top-level intervals; no universal covering interval is
//! needed. Public operations translate to node operations on that container
//! and project the resulting nodes to their values.

use tracing::trace;

use super::IntervalMap;
use super::child_map::ChildNodeTreeMap;
use super::node::InternalNode;
use crate::error::TreeError;
use crate::interval::Interval;

/// Map from intervals to values that exploits interval nesting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NestedIntervalMap<K, V> {
    children: ChildNodeTreeMap<K, V>,
    len: usize,
}

impl<K, V> NestedIntervalMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            children: ChildNodeTreeMap::new(),
            len: 0,
        }
    }

    /// Number of stored intervals
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.children = ChildNodeTreeMap::new();
        self.len = 0;
    }

    /// All entries in canonical interval order (parents before children)
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.children.iter().map(|node| (node.interval(), node.value()))
    }
}

impl<K: Interval, V> NestedIntervalMap<K, V> {
    /// Insert `key`, or replace its value if already present.
    ///
    /// Returns the replaced value. Fails without modifying the map when `key`
    /// partially overlaps an existing interval.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, TreeError<K>> {
        let previous = self.children.add_child(InternalNode::new(key, value))?;
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Remove `key`, moving its children up to its parent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.children.remove_child(key);
        if removed.is_some() {
            self.len -= 1;
            trace!(?key, "removed interval");
        }
        removed
    }

    /// Remove `key` only if its current value equals `value`.
    pub fn remove_with_value(&mut self, key: &K, value: &V) -> Option<V>
    where
        V: PartialEq,
    {
        if self.find_exact(key) == Some(value) {
            self.remove(key)
        } else {
            None
        }
    }

    fn internal_find_exact_or_first_less_specific(&self, range: &K) -> Option<&InternalNode<K, V>> {
        let mut current = self.children.child_containing(range)?;
        while let Some(next) = current.children().child_containing(range) {
            current = next;
        }
        Some(current)
    }

    fn internal_find_exact_and_all_less_specific(&self, range: &K) -> Vec<&InternalNode<K, V>> {
        let mut result = Vec::new();
        self.children.find_exact_and_all_less_specific(&mut result, range);
        result
    }

    fn internal_find_all_less_specific(&self, range: &K) -> Vec<&InternalNode<K, V>> {
        let mut result = self.internal_find_exact_and_all_less_specific(range);
        if result.last().is_some_and(|node| node.interval() == range) {
            result.pop();
        }
        result
    }

    fn internal_find_more_specific(&self, range: &K, include_exact: bool) -> Vec<&InternalNode<K, V>> {
        let mut result = Vec::new();
        match self.internal_find_exact_or_first_less_specific(range) {
            None => self.children.find_exact_and_all_more_specific(&mut result, range),
            Some(node) if node.interval() == range => {
                if include_exact {
                    result.push(node);
                }
                node.children().add_all_to_list(&mut result);
            }
            Some(node) => node.children().find_exact_and_all_more_specific(&mut result, range),
        }
        result
    }

    /// The value stored for exactly `key`
    pub fn find_exact(&self, key: &K) -> Option<&V> {
        self.internal_find_exact_or_first_less_specific(key)
            .filter(|node| node.interval() == key)
            .map(InternalNode::value)
    }

    /// The value of the nearest interval strictly containing `key`
    pub fn find_first_less_specific(&self, key: &K) -> Option<&V> {
        self.internal_find_all_less_specific(key)
            .pop()
            .map(InternalNode::value)
    }

    /// The exact match if present, otherwise the nearest interval containing `key`
    pub fn find_exact_or_first_less_specific(&self, key: &K) -> Option<&V> {
        self.internal_find_exact_or_first_less_specific(key)
            .map(InternalNode::value)
    }

    /// Values of every interval strictly containing `key`, outermost first
    pub fn find_all_less_specific(&self, key: &K) -> Vec<&V> {
        values(self.internal_find_all_less_specific(key))
    }

    /// Values of every interval containing `key`, outermost first, with an
    /// exact match last
    pub fn find_exact_and_all_less_specific(&self, key: &K) -> Vec<&V> {
        values(self.internal_find_exact_and_all_less_specific(key))
    }

    /// Values of the outermost intervals strictly inside `key`
    pub fn find_first_more_specific(&self, key: &K) -> Vec<&V> {
        let mut result = Vec::new();
        match self.internal_find_exact_or_first_less_specific(key) {
            None => self.children.find_first_more_specific(&mut result, key),
            Some(node) => node.children().find_first_more_specific(&mut result, key),
        }
        values(result)
    }

    /// Values of every interval strictly inside `key`, in canonical order
    pub fn find_all_more_specific(&self, key: &K) -> Vec<&V> {
        values(self.internal_find_more_specific(key, false))
    }

    /// Values of every interval inside `key` including an exact match, in
    /// canonical order
    pub fn find_exact_and_all_more_specific(&self, key: &K) -> Vec<&V> {
        values(self.internal_find_more_specific(key, true))
    }
}

fn values<K, V>(nodes: Vec<&InternalNode<K, V>>) -> Vec<&V> {
    nodes.into_iter().map(InternalNode::value).collect()
}

impl<K, V> Default for NestedIntervalMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Interval, V> IntervalMap<K, V> for NestedIntervalMap<K, V> {
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, TreeError<K>> {
        NestedIntervalMap::put(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        NestedIntervalMap::remove(self, key)
    }

    fn remove_with_value(&mut self, key: &K, value: &V) -> Option<V>
    where
        V: PartialEq,
    {
        NestedIntervalMap::remove_with_value(self, key, value)
    }

    fn clear(&mut self) {
        NestedIntervalMap::clear(self)
    }

    fn find_exact(&self, key: &K) -> Option<&V> {
        NestedIntervalMap::find_exact(self, key)
    }

    fn find_first_less_specific(&self, key: &K) -> Option<&V> {
        NestedIntervalMap::find_first_less_specific(self, key)
    }

    fn find_exact_or_first_less_specific(&self, key: &K) -> Option<&V> {
        NestedIntervalMap::find_exact_or_first_less_specific(self, key)
    }

    fn find_all_less_specific(&self, key: &K) -> Vec<&V> {
        NestedIntervalMap::find_all_less_specific(self, key)
    }

    fn find_exact_and_all_less_specific(&self, key: &K) -> Vec<&V> {
        NestedIntervalMap::find_exact_and_all_less_specific(self, key)
    }

    fn find_first_more_specific(&self, key: &K) -> Vec<&V> {
        NestedIntervalMap::find_first_more_specific(self, key)
    }

    fn find_all_more_specific(&self, key: &K) -> Vec<&V> {
        NestedIntervalMap::find_all_more_specific(self, key)
    }

    fn find_exact_and_all_more_specific(&self, key: &K) -> Vec<&V> {
        NestedIntervalMap::find_exact_and_all_more_specific(self, key)
    }
}
