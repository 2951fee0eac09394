//! ipresource: nested interval tree for IP resource registries
//!
//! This crate provides an in-memory index of interval keys (usually IPv4 and
//! IPv6 address ranges) that keeps every stored interval either disjoint from
//! or fully nested inside its siblings. The hierarchy answers the questions a
//! routing or allocation registry asks: exact lookup, nearest enclosing
//! registration, and everything registered inside a range.

#![warn(missing_docs)]

/// Interval contract and the concrete IP interval types
pub mod interval;

/// Nested interval tree engine
pub mod etree;

/// Protocol-independent tree over IPv4 and IPv6 keys
pub mod ip_tree;

/// Bulk loading of interval/value text files
pub mod loader;

// Re-exports
pub use config::{LoaderConfig, OverlapPolicy};
pub use error::{Error, IntersectingIntervalError, IntervalParseError, TreeError};
pub use etree::{IntervalMap, NestedIntervalMap};
pub use interval::{Interval, IpInterval, Ipv4Interval, Ipv6Interval};
pub use ip_tree::IpTree;
pub use loader::LoadReport;

/// Error types for tree, parsing and loading operations
pub mod error {
    use std::io;

    use smallvec::SmallVec;
    use thiserror::Error;

    use crate::interval::IpInterval;

    /// Raised when a new interval partially overlaps one or two existing
    /// siblings without either containing the other.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
    #[error("{interval:?} intersects with existing {intersections:?}")]
    pub struct IntersectingIntervalError<K> {
        interval: K,
        intersections: SmallVec<[K; 2]>,
    }

    impl<K> IntersectingIntervalError<K> {
        pub(crate) fn new(interval: K, intersections: SmallVec<[K; 2]>) -> Self {
            debug_assert!(!intersections.is_empty() && intersections.len() <= 2);
            Self {
                interval,
                intersections,
            }
        }

        /// The interval that was rejected
        pub fn interval(&self) -> &K {
            &self.interval
        }

        /// The existing siblings it overlaps, lower-bound probe first
        pub fn intersections(&self) -> &[K] {
            &self.intersections
        }

        /// Convert the intervals carried by this error to another key type
        pub fn map_interval<T, F>(self, mut f: F) -> IntersectingIntervalError<T>
        where
            F: FnMut(K) -> T,
        {
            IntersectingIntervalError {
                interval: f(self.interval),
                intersections: self.intersections.into_iter().map(f).collect(),
            }
        }
    }

    /// Errors raised by tree mutations
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum TreeError<K> {
        /// The interval partially overlaps existing siblings
        #[error("{0}")]
        Intersecting(IntersectingIntervalError<K>),
        /// A mutation was attempted on the shared empty child node map
        #[error("unsupported operation on empty child node map: {0}")]
        UnsupportedOperation(&'static str),
        /// A node was asked to add or remove an interval outside its own
        #[error("{child:?} is not contained by {parent:?}")]
        NotContained {
            /// Interval of the node receiving the call
            parent: K,
            /// Interval that was passed in
            child: K,
        },
    }

    impl<K> TreeError<K> {
        /// Convert the intervals carried by this error to another key type
        pub fn map_interval<T, F>(self, mut f: F) -> TreeError<T>
        where
            F: FnMut(K) -> T,
        {
            match self {
                TreeError::Intersecting(err) => TreeError::Intersecting(err.map_interval(f)),
                TreeError::UnsupportedOperation(op) => TreeError::UnsupportedOperation(op),
                TreeError::NotContained { parent, child } => TreeError::NotContained {
                    parent: f(parent),
                    child: f(child),
                },
            }
        }

        /// The overlap details, if this is an overlap rejection
        pub fn as_intersecting(&self) -> Option<&IntersectingIntervalError<K>> {
            match self {
                TreeError::Intersecting(err) => Some(err),
                _ => None,
            }
        }
    }

    impl<K> From<IntersectingIntervalError<K>> for TreeError<K> {
        fn from(err: IntersectingIntervalError<K>) -> Self {
            TreeError::Intersecting(err)
        }
    }

    /// Errors raised while constructing or parsing an interval
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum IntervalParseError {
        /// Begin lies after end
        #[error("begin {begin} not before end {end}")]
        BeginAfterEnd {
            /// Rendered begin bound
            begin: String,
            /// Rendered end bound
            end: String,
        },
        /// The address text is malformed
        #[error("{0} is not a valid address")]
        InvalidAddress(String),
        /// The prefix length is not a number or exceeds the address width
        #[error("prefix length {0} is invalid")]
        InvalidPrefixLength(String),
    }

    /// Errors raised by the loader and the command line front-end
    #[derive(Debug, Error)]
    pub enum Error {
        /// An I/O error occurred
        #[error("I/O error: {0}")]
        Io(#[from] io::Error),
        /// An interval on the given line could not be parsed
        #[error("line {line}: {source}")]
        Parse {
            /// One-based line number
            line: usize,
            /// Underlying parse failure
            source: IntervalParseError,
        },
        /// An interval given on the command line could not be parsed
        #[error("invalid query interval: {0}")]
        Query(#[source] IntervalParseError),
        /// An interval on the given line overlaps an existing one
        #[error("line {line}: {source}")]
        Overlap {
            /// One-based line number
            line: usize,
            /// Underlying tree rejection
            source: TreeError<IpInterval>,
        },
    }
}

/// Configuration options for loading interval files
pub mod config {
    /// What the loader does when a line overlaps an already loaded interval
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum OverlapPolicy {
        /// Stop loading and report the offending line
        #[default]
        Abort,
        /// Log the offending line and continue
        Skip,
    }

    /// Configuration for [`crate::loader`]
    #[derive(Debug, Clone)]
    pub struct LoaderConfig {
        /// Behaviour on partially overlapping intervals
        pub overlap_policy: OverlapPolicy,
        /// Whether unparseable lines are logged and skipped instead of failing
        pub skip_invalid_lines: bool,
        /// Lines starting with this character are ignored
        pub comment_prefix: char,
    }

    impl Default for LoaderConfig {
        fn default() -> Self {
            Self {
                overlap_policy: OverlapPolicy::Abort,
                skip_invalid_lines: false,
                comment_prefix: '#',
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_error_display() {
        let err: TreeError<Ipv4Interval> = IntersectingIntervalError::new(
            Ipv4Interval::new(8, 13).unwrap(),
            smallvec::smallvec![Ipv4Interval::new(1, 12).unwrap()],
        )
        .into();

        let message = err.to_string();
        assert!(message.contains("intersects"));
        assert!(err.as_intersecting().is_some());
    }

    #[test]
    fn test_map_interval_preserves_conflicts() {
        let err = IntersectingIntervalError::new(
            Ipv4Interval::new(4, 21).unwrap(),
            smallvec::smallvec![
                Ipv4Interval::new(1, 10).unwrap(),
                Ipv4Interval::new(16, 25).unwrap()
            ],
        );

        let mapped = err.map_interval(IpInterval::from);
        assert_eq!(mapped.interval(), &IpInterval::V4(Ipv4Interval::new(4, 21).unwrap()));
        assert_eq!(mapped.intersections().len(), 2);
        assert_eq!(
            mapped.intersections()[1],
            IpInterval::V4(Ipv4Interval::new(16, 25).unwrap())
        );
    }

    #[test]
    fn test_loader_config_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.overlap_policy, OverlapPolicy::Abort);
        assert!(!config.skip_invalid_lines);
        assert_eq!(config.comment_prefix, '#');
    }
}
