//! Sibling containers
//!
//! A [`ChildNodeTreeMap`] holds the children of one parent, keyed by each
//! child's interval but ordered by the interval's *upper bound* only. Siblings
//! are never allowed to partially overlap, and no sibling contains another, so
//! the first entry whose upper bound is at or above a range's lower bound is
//! the only candidate that can contain that range.
//!
//! Leaf nodes carry [`ChildNodeMap::EMPTY`], which owns no allocation and
//! refuses mutation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::hash::{Hash, Hasher};
use std::iter;

use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use super::node::InternalNode;
use crate::error::{IntersectingIntervalError, TreeError};
use crate::interval::Interval;

/// Map key ordering an interval by its upper bound.
///
/// Not consistent with `K: Eq`: two different intervals ending at the same
/// point compare equal here.
#[derive(Debug, Clone)]
struct UpperBound<K>(K);

impl<K: Interval> PartialEq for UpperBound<K> {
    fn eq(&self, other: &Self) -> bool {
        self.0.compare_upper_bound(&other.0) == Ordering::Equal
    }
}

impl<K: Interval> Eq for UpperBound<K> {}

impl<K: Interval> PartialOrd for UpperBound<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Interval> Ord for UpperBound<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.compare_upper_bound(&other.0)
    }
}

fn intersects_but_not_contained<K: Interval>(left: &K, right: &K) -> bool {
    left.intersects(right) && !left.contains(right) && !right.contains(left)
}

/// Ordered, mutable set of sibling nodes
#[derive(Debug, Clone)]
pub struct ChildNodeTreeMap<K, V> {
    entries: BTreeMap<UpperBound<K>, InternalNode<K, V>>,
}

impl<K, V> ChildNodeTreeMap<K, V> {
    /// Create an empty sibling container
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no direct children
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct children in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = &InternalNode<K, V>> {
        self.entries.values()
    }

    /// Pre-order walk over every node below this level
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            stack: vec![self.entries.values()],
        }
    }

    /// Append every node below this level to `list`, pre-order
    pub fn add_all_to_list<'a>(&'a self, list: &mut Vec<&'a InternalNode<K, V>>) {
        list.extend(self.iter());
    }
}

impl<K: Interval, V> ChildNodeTreeMap<K, V> {
    fn ceiling(&self, probe: K) -> Option<&InternalNode<K, V>> {
        self.entries
            .range(UpperBound(probe)..)
            .next()
            .map(|(_, node)| node)
    }

    /// The direct child containing `range`, if any
    pub(crate) fn child_containing(&self, range: &K) -> Option<&InternalNode<K, V>> {
        self.ceiling(range.singleton_at_lower_bound())
            .filter(|node| node.interval().contains(range))
    }

    fn child_containing_mut(&mut self, range: &K) -> Option<&mut InternalNode<K, V>> {
        self.entries
            .range_mut(UpperBound(range.singleton_at_lower_bound())..)
            .next()
            .map(|(_, node)| node)
            .filter(|node| node.interval().contains(range))
    }

    /// Insert `node` at this level, or below the sibling containing it.
    ///
    /// Siblings contained by `node` are moved beneath it. Returns the replaced
    /// value when the interval was already present. A partial overlap with an
    /// existing sibling leaves the container untouched and reports the
    /// conflicting siblings. When `node` already has children, every absorbed
    /// subtree must nest cleanly into them; otherwise the first conflicting
    /// existing interval is reported and nothing is moved.
    pub fn add_child(&mut self, node: InternalNode<K, V>) -> Result<Option<V>, TreeError<K>> {
        let range = node.interval().clone();
        if let Some(containing) = self.child_containing_mut(&range) {
            return containing.add_child(node);
        }

        let intersections = self.intersecting_children(&range);
        if !intersections.is_empty() {
            debug!(interval = ?range, ?intersections, "rejecting intersecting interval");
            return Err(IntersectingIntervalError::new(range, intersections).into());
        }

        let mut node = node;
        self.transfer_child_nodes(&mut node)?;

        match self.entries.insert(UpperBound(range.clone()), node) {
            Some(previous) if *previous.interval() == range => Ok(Some(previous.into_value())),
            previous => {
                debug_assert!(previous.is_none(), "disjoint intervals share an upper bound");
                Ok(None)
            }
        }
    }

    /// Move every sibling contained by `node` beneath it. Contained siblings
    /// form a contiguous run starting at the lower-bound probe.
    fn transfer_child_nodes(&mut self, node: &mut InternalNode<K, V>) -> Result<(), TreeError<K>> {
        let range = node.interval().clone();
        let contained: Vec<UpperBound<K>> = self
            .entries
            .range(UpperBound(range.singleton_at_lower_bound())..)
            .map_while(|(key, _)| range.contains(&key.0).then(|| key.clone()))
            .collect();

        if contained.is_empty() {
            return Ok(());
        }

        if !node.children().is_empty() {
            let conflict = contained
                .iter()
                .filter_map(|key| self.entries.get(key))
                .flat_map(|sibling| iter::once(sibling).chain(sibling.children().iter()))
                .map(InternalNode::interval)
                .find(|interval| !node.children().accepts(interval));
            if let Some(conflict) = conflict {
                debug!(interval = ?range, ?conflict, "rejecting subtree that cannot absorb siblings");
                return Err(IntersectingIntervalError::new(range, smallvec![conflict.clone()]).into());
            }
        }

        trace!(interval = ?range, absorbed = contained.len(), "absorbing siblings");
        for key in contained {
            if let Some(child) = self.entries.remove(&key) {
                node.add_child(child)?;
            }
        }
        Ok(())
    }

    /// Whether `range` could be added at or below this level without a
    /// partial overlap and without duplicating an existing interval
    fn accepts(&self, range: &K) -> bool {
        match self.child_containing(range) {
            Some(child) if child.interval() == range => false,
            Some(child) => child.children().accepts(range),
            None => self.intersecting_children(range).is_empty(),
        }
    }

    fn intersecting_children(&self, range: &K) -> SmallVec<[K; 2]> {
        let lower = self.ceiling(range.singleton_at_lower_bound());
        let upper = self.ceiling(range.clone());

        let mut result = SmallVec::new();
        for candidate in [lower, upper].into_iter().flatten() {
            let interval = candidate.interval();
            if intersects_but_not_contained(range, interval) && !result.contains(interval) {
                result.push(interval.clone());
            }
        }
        result
    }

    /// Remove the node with exactly `interval` from this level or below.
    ///
    /// The removed node's children take its place among its former siblings.
    /// Removing an absent interval is a no-op.
    pub fn remove_child(&mut self, interval: &K) -> Option<V> {
        let key = UpperBound(self.child_containing(interval)?.interval().clone());

        if key.0 != *interval {
            return self.entries.get_mut(&key)?.remove_descendant(interval);
        }

        let (value, children) = self.entries.remove(&key)?.into_parts();
        if let Some(children) = children.into_tree() {
            trace!(?interval, promoted = children.len(), "promoting children of removed node");
            for child in children.entries.into_values() {
                self.entries.insert(UpperBound(child.interval().clone()), child);
            }
        }
        Some(value)
    }

    /// Collect the chain of nodes containing `range`, outermost first
    pub fn find_exact_and_all_less_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        if let Some(node) = self.child_containing(range) {
            result.push(node);
            node.children().find_exact_and_all_less_specific(result, range);
        }
    }

    /// Collect every node contained by `range`, pre-order
    pub fn find_exact_and_all_more_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        for (_, node) in self.entries.range(UpperBound(range.singleton_at_lower_bound())..) {
            if range.contains(node.interval()) {
                result.push(node);
                node.children().add_all_to_list(result);
            } else if range.intersects(node.interval()) {
                node.children().find_exact_and_all_more_specific(result, range);
            } else {
                break;
            }
        }
    }

    /// Collect the topmost nodes contained by `range`
    pub fn find_first_more_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        for (_, node) in self.entries.range(UpperBound(range.singleton_at_lower_bound())..) {
            if range.contains(node.interval()) {
                result.push(node);
            } else if range.intersects(node.interval()) {
                node.children().find_first_more_specific(result, range);
            } else {
                break;
            }
        }
    }
}

impl<K, V> Default for ChildNodeTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for ChildNodeTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.values().eq(other.entries.values())
    }
}

impl<K: Eq, V: Eq> Eq for ChildNodeTreeMap<K, V> {}

impl<K: Hash, V: Hash> Hash for ChildNodeTreeMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.entries.len());
        for node in self.entries.values() {
            node.hash(state);
        }
    }
}

/// Children of a node: either the shared empty state or a populated container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildNodeMap<K, V> {
    tree: Option<Box<ChildNodeTreeMap<K, V>>>,
}

impl<K, V> ChildNodeMap<K, V> {
    /// The empty, immutable child map every leaf starts with
    pub const EMPTY: Self = Self { tree: None };

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, |tree| tree.len())
    }

    /// Whether there are no direct children
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    /// Direct children in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = &InternalNode<K, V>> {
        self.tree.iter().flat_map(|tree| tree.nodes())
    }

    /// Pre-order walk over every node below this level
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            stack: self.tree.iter().map(|tree| tree.entries.values()).collect(),
        }
    }

    /// Append every node below this level to `list`, pre-order
    pub fn add_all_to_list<'a>(&'a self, list: &mut Vec<&'a InternalNode<K, V>>) {
        list.extend(self.iter());
    }

    /// The populated container, allocating it on first use
    pub(crate) fn populated(&mut self) -> &mut ChildNodeTreeMap<K, V> {
        self.tree.get_or_insert_with(Default::default)
    }

    pub(crate) fn into_tree(self) -> Option<ChildNodeTreeMap<K, V>> {
        self.tree.map(|tree| *tree)
    }
}

impl<K: Interval, V> ChildNodeMap<K, V> {
    /// Insert into the populated container. Fails on the empty map.
    pub fn add_child(&mut self, node: InternalNode<K, V>) -> Result<Option<V>, TreeError<K>> {
        match &mut self.tree {
            Some(tree) => tree.add_child(node),
            None => Err(TreeError::UnsupportedOperation("add_child")),
        }
    }

    /// Remove from the populated container. Fails on the empty map.
    pub fn remove_child(&mut self, interval: &K) -> Result<Option<V>, TreeError<K>> {
        match &mut self.tree {
            Some(tree) => Ok(tree.remove_child(interval)),
            None => Err(TreeError::UnsupportedOperation("remove_child")),
        }
    }

    /// Remove `interval` from below this level, releasing the container
    /// once it has no children left.
    pub(crate) fn remove_descendant(&mut self, interval: &K) -> Option<V> {
        let tree = self.tree.as_mut()?;
        let removed = tree.remove_child(interval);
        if tree.is_empty() {
            self.tree = None;
        }
        removed
    }

    pub(crate) fn child_containing(&self, range: &K) -> Option<&InternalNode<K, V>> {
        self.tree.as_ref()?.child_containing(range)
    }

    fn accepts(&self, range: &K) -> bool {
        self.tree.as_ref().is_none_or(|tree| tree.accepts(range))
    }

    /// See [`ChildNodeTreeMap::find_exact_and_all_less_specific`]
    pub fn find_exact_and_all_less_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        if let Some(tree) = &self.tree {
            tree.find_exact_and_all_less_specific(result, range);
        }
    }

    /// See [`ChildNodeTreeMap::find_exact_and_all_more_specific`]
    pub fn find_exact_and_all_more_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        if let Some(tree) = &self.tree {
            tree.find_exact_and_all_more_specific(result, range);
        }
    }

    /// See [`ChildNodeTreeMap::find_first_more_specific`]
    pub fn find_first_more_specific<'a>(
        &'a self,
        result: &mut Vec<&'a InternalNode<K, V>>,
        range: &K,
    ) {
        if let Some(tree) = &self.tree {
            tree.find_first_more_specific(result, range);
        }
    }
}

impl<K, V> Default for ChildNodeMap<K, V> {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Pre-order iterator over a subtree
pub struct Iter<'a, K, V> {
    stack: Vec<btree_map::Values<'a, UpperBound<K>, InternalNode<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a InternalNode<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(node) => {
                    if let Some(tree) = &node.children().tree {
                        self.stack.push(tree.entries.values());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Ipv4Interval;

    fn v4(begin: u32, end: u32) -> Ipv4Interval {
        Ipv4Interval::new(begin, end).unwrap()
    }

    fn leaf(begin: u32, end: u32) -> InternalNode<Ipv4Interval, u32> {
        InternalNode::new(v4(begin, end), begin * 100 + end)
    }

    fn intervals(nodes: &[&InternalNode<Ipv4Interval, u32>]) -> Vec<Ipv4Interval> {
        nodes.iter().map(|node| *node.interval()).collect()
    }

    #[test]
    fn test_empty_map_rejects_add() {
        let mut empty: ChildNodeMap<Ipv4Interval, u32> = ChildNodeMap::EMPTY;
        assert_eq!(
            empty.add_child(leaf(1, 2)),
            Err(TreeError::UnsupportedOperation("add_child"))
        );
        assert!(empty.is_empty());
    }

    #[test]
    fn test_empty_map_rejects_remove() {
        let mut empty: ChildNodeMap<Ipv4Interval, u32> = ChildNodeMap::EMPTY;
        assert_eq!(
            empty.remove_child(&v4(1, 2)),
            Err(TreeError::UnsupportedOperation("remove_child"))
        );
    }

    #[test]
    fn test_empty_map_queries_are_no_ops() {
        let empty: ChildNodeMap<Ipv4Interval, u32> = ChildNodeMap::default();
        let mut result = Vec::new();
        empty.find_exact_and_all_less_specific(&mut result, &v4(1, 2));
        empty.find_exact_and_all_more_specific(&mut result, &v4(1, 2));
        empty.find_first_more_specific(&mut result, &v4(1, 2));
        empty.add_all_to_list(&mut result);
        assert!(result.is_empty());
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_add_child_nests_into_container() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(1, 12)).unwrap();
        map.add_child(leaf(5, 10)).unwrap();

        assert_eq!(map.len(), 1);
        let parent = map.nodes().next().unwrap();
        assert_eq!(parent.children().len(), 1);
        assert_eq!(*parent.children().nodes().next().unwrap().interval(), v4(5, 10));
    }

    #[test]
    fn test_add_child_absorbs_contained_siblings() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(1, 1)).unwrap();
        map.add_child(leaf(3, 4)).unwrap();
        map.add_child(leaf(6, 6)).unwrap();
        map.add_child(leaf(9, 9)).unwrap();

        map.add_child(leaf(1, 5)).unwrap();

        let top: Vec<_> = map.nodes().map(|node| *node.interval()).collect();
        assert_eq!(top, vec![v4(1, 5), v4(6, 6), v4(9, 9)]);
        let absorbed: Vec<_> = map
            .nodes()
            .next()
            .unwrap()
            .children()
            .nodes()
            .map(|node| *node.interval())
            .collect();
        assert_eq!(absorbed, vec![v4(1, 1), v4(3, 4)]);
    }

    #[test]
    fn test_add_child_replaces_equal_interval() {
        let mut map = ChildNodeTreeMap::new();
        assert_eq!(map.add_child(leaf(1, 4)).unwrap(), None);
        assert_eq!(
            map.add_child(InternalNode::new(v4(1, 4), 7)).unwrap(),
            Some(104)
        );
        assert_eq!(*map.nodes().next().unwrap().value(), 7);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_add_child_rejects_partial_overlap_and_leaves_map_untouched() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(5, 20)).unwrap();
        let before = map.clone();

        let err = map.add_child(leaf(3, 10)).unwrap_err();
        let err = err.as_intersecting().unwrap();
        assert_eq!(*err.interval(), v4(3, 10));
        // both probes land on the same sibling, reported once
        assert_eq!(err.intersections(), &[v4(5, 20)]);
        assert_eq!(map, before);
    }

    #[test]
    fn test_add_subtree_conflicting_with_sibling_leaves_map_untouched() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(5, 8)).unwrap();
        let before = map.clone();

        let mut node = leaf(1, 10);
        node.add_child(leaf(3, 6)).unwrap();

        let err = map.add_child(node).unwrap_err();
        let err = err.as_intersecting().unwrap();
        assert_eq!(*err.interval(), v4(1, 10));
        assert_eq!(err.intersections(), &[v4(5, 8)]);
        assert_eq!(map.len(), 1);
        assert_eq!(map, before);
    }

    #[test]
    fn test_add_subtree_duplicating_sibling_is_rejected() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(3, 4)).unwrap();
        let before = map.clone();

        let mut node = leaf(1, 10);
        node.add_child(leaf(3, 4)).unwrap();

        assert!(map.add_child(node).is_err());
        assert_eq!(map, before);
    }

    #[test]
    fn test_add_subtree_absorbs_compatible_siblings() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(5, 6)).unwrap();
        map.add_child(leaf(7, 9)).unwrap();
        map.add_child(leaf(8, 8)).unwrap();

        let mut node = leaf(1, 10);
        node.add_child(leaf(2, 3)).unwrap();
        node.add_child(leaf(7, 10)).unwrap();

        assert_eq!(map.add_child(node).unwrap(), None);
        let mut all = Vec::new();
        map.add_all_to_list(&mut all);
        assert_eq!(
            intervals(&all),
            vec![v4(1, 10), v4(2, 3), v4(5, 6), v4(7, 10), v4(7, 9), v4(8, 8)]
        );
    }

    #[test]
    fn test_remove_child_promotes_children() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(1, 10)).unwrap();
        map.add_child(leaf(1, 5)).unwrap();
        map.add_child(leaf(6, 10)).unwrap();
        map.add_child(leaf(2, 2)).unwrap();

        assert_eq!(map.remove_child(&v4(1, 10)), Some(110));
        let top: Vec<_> = map.nodes().map(|node| *node.interval()).collect();
        assert_eq!(top, vec![v4(1, 5), v4(6, 10)]);
        assert_eq!(map.nodes().next().unwrap().children().len(), 1);
    }

    #[test]
    fn test_remove_child_nested_releases_empty_container() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(1, 10)).unwrap();
        map.add_child(leaf(2, 3)).unwrap();

        assert_eq!(map.remove_child(&v4(2, 3)), Some(203));
        let parent = map.nodes().next().unwrap();
        assert!(parent.children().is_empty());
        assert_eq!(parent.children(), &ChildNodeMap::EMPTY);
    }

    #[test]
    fn test_remove_child_absent_is_no_op() {
        let mut map = ChildNodeTreeMap::new();
        map.add_child(leaf(1, 10)).unwrap();
        let before = map.clone();

        assert_eq!(map.remove_child(&v4(2, 3)), None);
        assert_eq!(map.remove_child(&v4(0, 100)), None);
        assert_eq!(map.remove_child(&v4(11, 11)), None);
        assert_eq!(map, before);
    }

    #[test]
    fn test_queries_and_pre_order_walk() {
        let mut map = ChildNodeTreeMap::new();
        for (begin, end) in [(1, 12), (1, 4), (5, 10), (1, 1), (5, 8), (9, 10), (11, 12)] {
            map.add_child(leaf(begin, end)).unwrap();
        }

        let mut less = Vec::new();
        map.find_exact_and_all_less_specific(&mut less, &v4(6, 6));
        assert_eq!(intervals(&less), vec![v4(1, 12), v4(5, 10), v4(5, 8)]);

        let mut more = Vec::new();
        map.find_exact_and_all_more_specific(&mut more, &v4(5, 12));
        assert_eq!(intervals(&more), vec![v4(5, 10), v4(5, 8), v4(9, 10), v4(11, 12)]);

        let mut first = Vec::new();
        map.find_first_more_specific(&mut first, &v4(5, 12));
        assert_eq!(intervals(&first), vec![v4(5, 10), v4(11, 12)]);

        let mut all = Vec::new();
        map.add_all_to_list(&mut all);
        assert_eq!(
            intervals(&all),
            vec![v4(1, 12), v4(1, 4), v4(1, 1), v4(5, 10), v4(5, 8), v4(9, 10), v4(11, 12)]
        );
    }
}
