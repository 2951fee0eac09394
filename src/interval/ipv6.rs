//! IPv6 address ranges
//!
//! Ranges are stored as a pair of inclusive `u128` bounds. Text input accepts
//! prefixes (`2001:db8::/32`), explicit ranges (`2001:db8:: - 2001:db8::ff`)
//! and single addresses, using standard IPv6 address syntax.

use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use super::Interval;
use crate::error::IntervalParseError;

const BITS: u8 = 128;

/// An inclusive IPv6 address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Interval {
    begin: u128,
    end: u128,
}

impl Ipv6Interval {
    /// The range covering all IPv6 addresses (`::/0`)
    pub const MAX_RANGE: Ipv6Interval = Ipv6Interval {
        begin: 0,
        end: u128::MAX,
    };

    /// Create a range with inclusive bounds
    pub fn new(begin: u128, end: u128) -> Result<Self, IntervalParseError> {
        if begin > end {
            return Err(IntervalParseError::BeginAfterEnd {
                begin: Ipv6Addr::from(begin).to_string(),
                end: Ipv6Addr::from(end).to_string(),
            });
        }
        Ok(Self { begin, end })
    }

    /// Create the prefix of the given length containing `address`.
    ///
    /// Host bits of `address` are masked off.
    pub fn from_prefix(address: u128, prefix_length: u8) -> Result<Self, IntervalParseError> {
        if prefix_length > BITS {
            return Err(IntervalParseError::InvalidPrefixLength(prefix_length.to_string()));
        }
        let host_mask = u128::MAX.checked_shr(u32::from(prefix_length)).unwrap_or(0);
        Ok(Self {
            begin: address & !host_mask,
            end: address | host_mask,
        })
    }

    /// First address in the range
    pub fn begin(&self) -> u128 {
        self.begin
    }

    /// Last address in the range
    pub fn end(&self) -> u128 {
        self.end
    }

    /// First address in the range
    pub fn begin_address(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.begin)
    }

    /// Last address in the range
    pub fn end_address(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.end)
    }

    /// The prefix length, if the range is an aligned prefix
    pub fn prefix_length(&self) -> Option<u8> {
        let host_mask = self.begin ^ self.end;
        let contiguous = host_mask & host_mask.wrapping_add(1) == 0;
        if contiguous && self.begin & host_mask == 0 {
            Some(BITS - host_mask.count_ones() as u8)
        } else {
            None
        }
    }

    /// Render as `begin - end` regardless of prefix alignment
    pub fn to_range_string(&self) -> String {
        format!("{} - {}", self.begin_address(), self.end_address())
    }

    fn parse_address(text: &str) -> Result<u128, IntervalParseError> {
        text.parse::<Ipv6Addr>()
            .map(u128::from)
            .map_err(|_| IntervalParseError::InvalidAddress(text.to_string()))
    }
}

impl Ord for Ipv6Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then_with(|| other.end.cmp(&self.end))
    }
}

impl PartialOrd for Ipv6Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Interval for Ipv6Interval {
    fn contains(&self, other: &Self) -> bool {
        self.begin <= other.begin && self.end >= other.end
    }

    fn intersects(&self, other: &Self) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    fn compare_upper_bound(&self, other: &Self) -> Ordering {
        self.end.cmp(&other.end)
    }

    fn singleton_at_lower_bound(&self) -> Self {
        Self {
            begin: self.begin,
            end: self.begin,
        }
    }
}

impl From<Ipv6Addr> for Ipv6Interval {
    fn from(address: Ipv6Addr) -> Self {
        let address = u128::from(address);
        Self {
            begin: address,
            end: address,
        }
    }
}

impl FromStr for Ipv6Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some((address, length)) = s.split_once('/') {
            let address = Self::parse_address(address.trim())?;
            let length = length.trim();
            let prefix_length = length
                .parse::<u8>()
                .map_err(|_| IntervalParseError::InvalidPrefixLength(length.to_string()))?;
            return Self::from_prefix(address, prefix_length);
        }

        if let Some((begin, end)) = s.split_once('-') {
            return Self::new(
                Self::parse_address(begin.trim())?,
                Self::parse_address(end.trim())?,
            );
        }

        let address = Self::parse_address(s)?;
        Ok(Self {
            begin: address,
            end: address,
        })
    }
}

impl fmt::Display for Ipv6Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix_length() {
            Some(length) => write!(f, "{}/{}", self.begin_address(), length),
            None => write!(f, "{} - {}", self.begin_address(), self.end_address()),
        }
    }
}

#[cfg(feature = "serialization")]
impl serde::Serialize for Ipv6Interval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serialization")]
impl<'de> serde::Deserialize<'de> for Ipv6Interval {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
