//! direction.rs
//!
//! Direction codes and the path compatibility oracle.
//!
//! Every vehicle enters the intersection from one of four approaches
//! (`R`, `L`, `D`, `U`) and either goes straight (`s`), turns left (`l`) or
//! turns right (`r`). Two paths are compatible when both vehicles can occupy
//! the intersection at the same time without colliding.
//!
//! The table is directional: `compatible(a, b)` only tells whether `b` is
//! listed under `a`. The reverse lookup must be asked separately.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CrosswayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Rs,
    Rl,
    Rr,
    Ls,
    Ll,
    Lr,
    Ds,
    Dl,
    Dr,
    Us,
    Ul,
    Ur,
}

use Direction::*;

impl Direction {
    /// All twelve codes in table order.
    pub const ALL: [Direction; 12] = [Rs, Rl, Rr, Ls, Ll, Lr, Ds, Dl, Dr, Us, Ul, Ur];

    /// Two-letter wire code (`"Rs"`, `"Dl"`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Rs => "Rs",
            Rl => "Rl",
            Rr => "Rr",
            Ls => "Ls",
            Ll => "Ll",
            Lr => "Lr",
            Ds => "Ds",
            Dl => "Dl",
            Dr => "Dr",
            Us => "Us",
            Ul => "Ul",
            Ur => "Ur",
        }
    }

    /// Paths that may cross together with `self`.
    pub fn compatible_set(self) -> &'static [Direction] {
        match self {
            Rs => &[Rs, Ls, Ur, Dr],
            Rl => &[Rl, Ll, Dr, Us],
            Rr => &[Rr, Us, Ds, Lr, Ls],
            Ls => &[Ls, Rs, Ur, Dr],
            Ll => &[Ll, Rl, Dr, Us],
            Lr => &[Lr, Ds, Us, Rr, Rs],
            Ds => &[Ds, Us, Rr, Lr],
            Dl => &[Dl, Ul, Rr, Ls],
            Dr => &[Dr, Rs, Ls, Ur, Us],
            Us => &[Us, Ds, Rr, Lr],
            Ul => &[Ul, Dl, Ls, Rr],
            Ur => &[Ur, Ls, Ds, Rs, Rr],
        }
    }

    /// Whether `other` appears in `self`'s compatibility list.
    pub fn allows(self, other: Direction) -> bool {
        self.compatible_set().contains(&other)
    }

    /// Picks one of the twelve codes uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = CrosswayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.code() == s)
            .ok_or_else(|| CrosswayError::UnknownDirection(s.to_string()))
    }
}

/// Oracle lookup on raw codes. Unknown codes on either side are never compatible.
pub fn compatible(key: &str, value: &str) -> bool {
    match (key.parse::<Direction>(), value.parse::<Direction>()) {
        (Ok(k), Ok(v)) => k.allows(v),
        _ => false,
    }
}
