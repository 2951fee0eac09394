//! Tree node owning one interval, its value and its children

use std::mem;

use super::child_map::ChildNodeMap;
use crate::error::TreeError;
use crate::interval::Interval;

/// A node of the nested interval tree.
///
/// Equality and hashing include the whole subtree: two nodes with the same
/// interval and value but different children are different tree states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalNode<K, V> {
    interval: K,
    value: V,
    children: ChildNodeMap<K, V>,
}

impl<K, V> InternalNode<K, V> {
    /// Create a leaf node
    pub fn new(interval: K, value: V) -> Self {
        Self {
            interval,
            value,
            children: ChildNodeMap::EMPTY,
        }
    }

    /// The node's interval
    pub fn interval(&self) -> &K {
        &self.interval
    }

    /// The node's value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The node's direct children
    pub fn children(&self) -> &ChildNodeMap<K, V> {
        &self.children
    }

    /// Consume the node, returning its value
    pub fn into_value(self) -> V {
        self.value
    }

    pub(crate) fn into_parts(self) -> (V, ChildNodeMap<K, V>) {
        (self.value, self.children)
    }
}

impl<K: Interval, V> InternalNode<K, V> {
    /// Add `node` somewhere below this node.
    ///
    /// An interval equal to this node's own replaces the value and returns
    /// the previous one.
    pub fn add_child(&mut self, node: InternalNode<K, V>) -> Result<Option<V>, TreeError<K>> {
        if self.interval == node.interval {
            return Ok(Some(mem::replace(&mut self.value, node.value)));
        }
        if !self.interval.contains(&node.interval) {
            return Err(TreeError::NotContained {
                parent: self.interval.clone(),
                child: node.interval,
            });
        }
        self.children.populated().add_child(node)
    }

    /// Remove `interval` from below this node, promoting its children.
    pub fn remove_child(&mut self, interval: &K) -> Result<Option<V>, TreeError<K>> {
        if !self.interval.contains(interval) {
            return Err(TreeError::NotContained {
                parent: self.interval.clone(),
                child: interval.clone(),
            });
        }
        Ok(self.remove_descendant(interval))
    }

    pub(crate) fn remove_descendant(&mut self, interval: &K) -> Option<V> {
        self.children.remove_descendant(interval)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::*;
    use crate::interval::Ipv4Interval;

    fn node(begin: u32, end: u32, value: &str) -> InternalNode<Ipv4Interval, String> {
        InternalNode::new(Ipv4Interval::new(begin, end).unwrap(), value.to_string())
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equals_and_hash_include_children() {
        let a = node(1, 2, "1-2");
        let b = node(1, 2, "1-2");
        let c = node(1, 4, "1-4");
        let mut d = node(1, 4, "1-4");
        d.add_child(a.clone()).unwrap();

        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(c, c);
        assert_ne!(a, c);
        assert_ne!(c, d);

        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(hash_of(&a), hash_of(&c));
        assert_ne!(hash_of(&c), hash_of(&d));
    }

    #[test]
    fn test_intersect_insert_fails() {
        let mut c = node(1, 4, "1-4");
        let e = node(2, 5, "2-5");
        assert!(matches!(c.add_child(e), Err(TreeError::NotContained { .. })));
        assert!(c.children().is_empty());
    }

    #[test]
    fn test_intersect_remove_fails() {
        let mut c = node(1, 4, "1-4");
        let e = Ipv4Interval::new(2, 5).unwrap();
        assert!(matches!(c.remove_child(&e), Err(TreeError::NotContained { .. })));
    }

    #[test]
    fn test_add_own_interval_replaces_value() {
        let mut c = node(1, 4, "1-4");
        let previous = c.add_child(node(1, 4, "replaced")).unwrap();
        assert_eq!(previous.as_deref(), Some("1-4"));
        assert_eq!(c.value(), "replaced");
        assert!(c.children().is_empty());
    }

    #[test]
    fn test_children_allocated_and_released() {
        let mut c = node(1, 4, "1-4");
        assert_eq!(c.remove_child(&Ipv4Interval::new(2, 2).unwrap()).unwrap(), None);

        c.add_child(node(2, 2, "2")).unwrap();
        assert_eq!(c.children().len(), 1);

        let removed = c.remove_child(&Ipv4Interval::new(2, 2).unwrap()).unwrap();
        assert_eq!(removed.as_deref(), Some("2"));
        assert_eq!(c.children(), &ChildNodeMap::EMPTY);
    }
}
