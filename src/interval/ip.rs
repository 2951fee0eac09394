//! Protocol-independent IP interval

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::{Ipv4Interval, Ipv6Interval};
use crate::error::IntervalParseError;

/// An IPv4 or IPv6 address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IpInterval {
    /// IPv4 range
    V4(Ipv4Interval),
    /// IPv6 range
    V6(Ipv6Interval),
}

impl IpInterval {
    /// The prefix length, if the range is an aligned prefix
    pub fn prefix_length(&self) -> Option<u8> {
        match self {
            IpInterval::V4(interval) => interval.prefix_length(),
            IpInterval::V6(interval) => interval.prefix_length(),
        }
    }

    /// Render as `begin - end` regardless of prefix alignment
    pub fn to_range_string(&self) -> String {
        match self {
            IpInterval::V4(interval) => interval.to_range_string(),
            IpInterval::V6(interval) => interval.to_range_string(),
        }
    }

    /// True for IPv4 ranges
    pub fn is_ipv4(&self) -> bool {
        matches!(self, IpInterval::V4(_))
    }
}

impl From<Ipv4Interval> for IpInterval {
    fn from(interval: Ipv4Interval) -> Self {
        IpInterval::V4(interval)
    }
}

impl From<Ipv6Interval> for IpInterval {
    fn from(interval: Ipv6Interval) -> Self {
        IpInterval::V6(interval)
    }
}

impl From<IpAddr> for IpInterval {
    fn from(address: IpAddr) -> Self {
        match address {
            IpAddr::V4(address) => IpInterval::V4(address.into()),
            IpAddr::V6(address) => IpInterval::V6(address.into()),
        }
    }
}

impl FromStr for IpInterval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            s.parse().map(IpInterval::V6)
        } else {
            s.parse().map(IpInterval::V4)
        }
    }
}

impl fmt::Display for IpInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpInterval::V4(interval) => fmt::Display::fmt(interval, f),
            IpInterval::V6(interval) => fmt::Display::fmt(interval, f),
        }
    }
}

#[cfg(feature = "serialization")]
impl serde::Serialize for IpInterval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serialization")]
impl<'de> serde::Deserialize<'de> for IpInterval {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
