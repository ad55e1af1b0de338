use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ReadError};

/// A chromosome token from the alphabet {1..22, X, Y, XY, MT, Unknown}
///
/// Internally each chromosome has an integer code (1..22, 23=X, 24=Y, 25=XY,
/// 26=MT, 0=Unknown) which is used for ordering and in the side-car index.
/// The string token is used at every output boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chromosome(u8);

impl Chromosome {
    pub const UNKNOWN: Self = Self(0);
    pub const X: Self = Self(23);
    pub const Y: Self = Self(24);
    pub const XY: Self = Self(25);
    pub const MT: Self = Self(26);

    /// Builds an autosome (1..=22)
    #[must_use]
    pub fn autosome(n: u8) -> Option<Self> {
        (1..=22).contains(&n).then_some(Self(n))
    }

    /// Builds a chromosome from its integer code
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        (code <= 26).then_some(Self(code))
    }

    /// Returns the integer code
    #[must_use]
    pub fn code(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Chromosome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .strip_prefix("chr")
            .or_else(|| s.strip_prefix("CHR"))
            .unwrap_or(s);
        let chrom = match token {
            "X" | "x" => Self::X,
            "Y" | "y" => Self::Y,
            "XY" | "xy" => Self::XY,
            "MT" | "M" | "mt" | "m" => Self::MT,
            "---" | "Unknown" => Self::UNKNOWN,
            _ => token
                .parse::<u8>()
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| ReadError::InvalidChromosome(s.to_string()))?,
        };
        Ok(chrom)
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("Unknown"),
            23 => f.write_str("X"),
            24 => f.write_str("Y"),
            25 => f.write_str("XY"),
            26 => f.write_str("MT"),
            n => write!(f, "{n}"),
        }
    }
}
