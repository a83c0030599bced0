//! fd_core: Core types, geometry primitives, valuations and allocations.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`fd_algo`, `fd_io`, `fd_pipeline`, `fd_report`, `fd_cli`).
//!
//! - Registry tokens: `PlayerId`, `RegionId`, `AlgorithmId`, `StepId`
//! - Geometry: `Span` (1-D), `Rect` (2-D), `Region`, `RegionSet`, `Piece`
//! - Player valuations (points per region, summing to a fixed total)
//! - Allocations (player → share), immutable once built
//! - Tunables (`Params`) with named defaults
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Minimal error set for token parsing and domain validation.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidToken,
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}

    /// Malformed geometry. These are caller errors: the input collaborator is
    /// expected to hand the engine well-formed coordinates.
    #[derive(Clone, Debug, PartialEq)]
    pub enum GeometryError {
        NonFinite { what: &'static str, value: f64 },
        EmptyRegion { start: f64, end: f64 },
        NegativePiece { start: f64, end: f64 },
        EmptyRect { width: f64, height: f64 },
        InvalidAxis(f64),
        CutOutOfRange { cut: f64, axis_length: f64 },
        DuplicateRegion(String),
        UnknownRegion(String),
    }

    impl fmt::Display for GeometryError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                GeometryError::NonFinite { what, value } => {
                    write!(f, "non-finite {what}: {value}")
                }
                GeometryError::EmptyRegion { start, end } => {
                    write!(f, "region bounds must satisfy start < end (got {start}..{end})")
                }
                GeometryError::NegativePiece { start, end } => {
                    write!(f, "piece has negative width ({start}..{end})")
                }
                GeometryError::EmptyRect { width, height } => {
                    write!(f, "rectangle must have positive extent (got {width}x{height})")
                }
                GeometryError::InvalidAxis(len) => write!(f, "axis length must be positive: {len}"),
                GeometryError::CutOutOfRange { cut, axis_length } => {
                    write!(f, "cut {cut} outside axis 0..{axis_length}")
                }
                GeometryError::DuplicateRegion(id) => write!(f, "duplicate region id: {id}"),
                GeometryError::UnknownRegion(id) => write!(f, "unknown region id: {id}"),
            }
        }
    }

    impl std::error::Error for GeometryError {}
}

pub mod tokens {
    //! Registry token types with a strict charset.

    use crate::errors::CoreError;
    use core::fmt;
    use core::str::FromStr;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    fn is_token(s: &str) -> bool {
        let len = s.len();
        if !(1..=64).contains(&len) { return false; }
        s.bytes().all(|b| matches!(b,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
            b'_' | b'-' | b':' | b'.'
        ))
    }

    macro_rules! def_token {
        ($name:ident) => {
            #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
            #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
            pub struct $name(String);

            impl $name {
                pub fn as_str(&self) -> &str { &self.0 }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
            }

            impl FromStr for $name {
                type Err = CoreError;
                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    if is_token(s) { Ok(Self(s.to_string())) } else { Err(CoreError::InvalidToken) }
                }
            }
        }
    }

    def_token!(PlayerId);
    def_token!(RegionId);
    def_token!(AlgorithmId);
    def_token!(StepId);

    impl PlayerId {
        /// Conventional seat name: `P1`, `P2`, … (1-based).
        pub fn numbered(n: usize) -> Self {
            PlayerId(format!("P{n}"))
        }
    }
}

pub mod geometry;
pub mod valuation;
pub mod allocation;
pub mod variables;

pub use errors::{CoreError, GeometryError};
pub use tokens::{AlgorithmId, PlayerId, RegionId, StepId};
pub use geometry::{Cut, Piece, Rect, Region, RegionSet, Shape, Span};
pub use valuation::{Valuation, Valuations};
pub use allocation::{Allocation, Share};
pub use variables::Params;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_reject_bad_charset() {
        assert!("P1".parse::<PlayerId>().is_ok());
        assert!("divide-and-choose".parse::<AlgorithmId>().is_ok());
        assert_eq!("has space".parse::<RegionId>(), Err(CoreError::InvalidToken));
        assert_eq!("".parse::<StepId>(), Err(CoreError::InvalidToken));
    }

    #[test]
    fn numbered_players_are_one_based() {
        assert_eq!(PlayerId::numbered(1).as_str(), "P1");
        assert_eq!(PlayerId::numbered(4).to_string(), "P4");
    }
}
