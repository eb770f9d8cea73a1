use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A `major.minor` revision packed as `(major << 16) | minor`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u32);

impl Revision {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn major(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn minor(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({self})")
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl FromStr for Revision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidRevision(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let major = major.trim().parse::<u16>().map_err(|_| invalid())?;
        let minor = minor.trim().parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_major_and_minor() {
        let rev = Revision::new(1, 1);
        assert_eq!(rev.raw(), 0x0001_0001);
        assert_eq!(rev.major(), 1);
        assert_eq!(rev.minor(), 1);
    }

    #[test]
    fn ordering_follows_major_then_minor() {
        assert!(Revision::new(1, 0) < Revision::new(1, 1));
        assert!(Revision::new(1, 9) < Revision::new(2, 0));
    }

    #[test]
    fn parse_and_display() {
        let rev: Revision = "2.13".parse().unwrap();
        assert_eq!(rev, Revision::new(2, 13));
        assert_eq!(rev.to_string(), "2.13");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("2".parse::<Revision>().is_err());
        assert!("a.b".parse::<Revision>().is_err());
        assert!("70000.0".parse::<Revision>().is_err());
    }

    #[test]
    fn serializes_as_raw_number() {
        let json = serde_json::to_string(&Revision::new(1, 0)).unwrap();
        assert_eq!(json, "65536");
    }
}
