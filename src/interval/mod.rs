//! Interval contract and concrete IP interval types
//!
//! The tree engine in [`crate::etree`] is generic over any key implementing
//! [`Interval`]. This module defines that contract and provides the IPv4 and
//! IPv6 address ranges the registry stores.

use std::cmp::Ordering;
use std::fmt::Debug;

pub mod ip;
pub mod ipv4;
pub mod ipv6;

// Re-export key types
pub use ip::IpInterval;
pub use ipv4::Ipv4Interval;
pub use ipv6::Ipv6Interval;

/// A closed range `[lower, upper]` over an ordered domain.
///
/// `Ord` must order ascending by lower bound and, for equal lower bounds,
/// descending by upper bound, so a less specific range sorts before a more
/// specific range starting at the same point. Two intervals that are disjoint
/// must never share an upper bound.
pub trait Interval: Clone + Eq + Ord + Debug {
    /// True iff `other` lies entirely within `self` (inclusive bounds)
    fn contains(&self, other: &Self) -> bool;

    /// True iff the two ranges share at least one point
    fn intersects(&self, other: &Self) -> bool;

    /// Compare the upper bounds only
    fn compare_upper_bound(&self, other: &Self) -> Ordering;

    /// The degenerate interval `[lower, lower]`
    fn singleton_at_lower_bound(&self) -> Self;
}
