//! IPv4 address ranges
//!
//! Ranges are stored as a pair of inclusive `u32` bounds. Text input accepts
//! CIDR prefixes (`10.0.0.0/8`, or the abbreviated `10/8`), explicit ranges
//! (`10.0.0.0 - 10.0.0.255`) and single addresses.

use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::Interval;
use crate::error::IntervalParseError;

const BITS: u8 = 32;

/// An inclusive IPv4 address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Interval {
    begin: u32,
    end: u32,
}

impl Ipv4Interval {
    /// The range covering all IPv4 addresses (`0.0.0.0/0`)
    pub const MAX_RANGE: Ipv4Interval = Ipv4Interval {
        begin: 0,
        end: u32::MAX,
    };

    /// Create a range with inclusive bounds
    pub fn new(begin: u32, end: u32) -> Result<Self, IntervalParseError> {
        if begin > end {
            return Err(IntervalParseError::BeginAfterEnd {
                begin: Ipv4Addr::from(begin).to_string(),
                end: Ipv4Addr::from(end).to_string(),
            });
        }
        Ok(Self { begin, end })
    }

    /// Create the prefix of the given length containing `address`.
    ///
    /// Host bits of `address` are masked off.
    pub fn from_prefix(address: u32, prefix_length: u8) -> Result<Self, IntervalParseError> {
        if prefix_length > BITS {
            return Err(IntervalParseError::InvalidPrefixLength(prefix_length.to_string()));
        }
        let host_mask = u32::MAX.checked_shr(u32::from(prefix_length)).unwrap_or(0);
        Ok(Self {
            begin: address & !host_mask,
            end: address | host_mask,
        })
    }

    /// First address in the range
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// Last address in the range
    pub fn end(&self) -> u32 {
        self.end
    }

    /// First address in the range
    pub fn begin_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.begin)
    }

    /// Last address in the range
    pub fn end_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }

    /// The CIDR prefix length, if the range is an aligned prefix
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

    /// Parse dotted-quad text. Missing trailing octets count as zero.
    fn parse_address(text: &str) -> Result<u32, IntervalParseError> {
        let invalid = || IntervalParseError::InvalidAddress(text.to_string());

        let mut result = 0u32;
        let mut octets = text.split('.');
        for _ in 0..4 {
            let octet = match octets.next() {
                Some(part) => {
                    // u8::from_str tolerates a leading '+'
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(invalid());
                    }
                    part.parse::<u8>().map_err(|_| invalid())?
                }
                None => 0,
            };
            result = (result << 8) | u32::from(octet);
        }
        if octets.next().is_some() {
            return Err(invalid());
        }
        Ok(result)
    }
}

impl Ord for Ipv4Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then_with(|| other.end.cmp(&self.end))
    }
}

impl PartialOrd for Ipv4Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Interval for Ipv4Interval {
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

impl From<Ipv4Addr> for Ipv4Interval {
    fn from(address: Ipv4Addr) -> Self {
        let address = u32::from(address);
        Self {
            begin: address,
            end: address,
        }
    }
}

impl FromStr for Ipv4Interval {
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

impl fmt::Display for Ipv4Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix_length() {
            Some(length) => write!(f, "{}/{}", self.begin_address(), length),
            None => write!(f, "{} - {}", self.begin_address(), self.end_address()),
        }
    }
}

#[cfg(feature = "serialization")]
impl serde::Serialize for Ipv4Interval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serialization")]
impl<'de> serde::Deserialize<'de> for Ipv4Interval {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
