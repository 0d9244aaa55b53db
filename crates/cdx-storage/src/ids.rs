//! ID types for the storage layer

use core::fmt;

/// Position of a link in the file's link table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkIndex(pub u32);

impl LinkIndex {
    /// Create a new link index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Index as a `usize` for table lookups
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Time-instant number of a CIR, shared by all links of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CirIndex(pub u64);

impl CirIndex {
    /// First time instant
    pub const FIRST: Self = Self(0);

    /// Create a new CIR index
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Get the raw index value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Get the next time instant
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Time of this instant in seconds for a given CIR rate
    pub fn time_s(&self, cir_rate_hz: f64) -> f64 {
        self.0 as f64 / cir_rate_hz
    }
}

impl fmt::Display for CirIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Serialize};

    impl Serialize for CirIndex {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            self.0.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for CirIndex {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let index = u64::deserialize(deserializer)?;
            Ok(CirIndex::new(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cir_index() {
        let n = CirIndex::new(41);
        assert_eq!(n.raw(), 41);
        assert_eq!(n.next(), CirIndex::new(42));
        assert_eq!(format!("{}", n), "#41");
        assert_eq!(CirIndex::new(250).time_s(100.0), 2.5);
    }

    #[test]
    fn test_link_index() {
        let link = LinkIndex::new(3);
        assert_eq!(link.as_usize(), 3);
        assert_eq!(format!("{}", link), "L3");
    }

    #[test]
    fn test_ordering() {
        assert!(CirIndex::FIRST < CirIndex::new(1));
        assert!(LinkIndex::new(0) < LinkIndex::new(1));
    }
}
