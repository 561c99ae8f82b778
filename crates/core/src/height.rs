//! Block height.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A block height.
///
/// `NIL` (-1) is the pre-genesis boundary: it is the watermark of an empty
/// read-model and the `previous_height` of a first-ever projection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Height(i64);

impl Height {
    /// The pre-genesis boundary.
    pub const NIL: Height = Height(-1);
    /// The first real block height.
    pub const GENESIS: Height = Height(0);

    pub fn new(v: i64) -> Self {
        Height(v.max(-1))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_nil(self) -> bool {
        self.0 < 0
    }

    /// The height directly below, clamped at `NIL`.
    pub fn prev(self) -> Height {
        Height((self.0 - 1).max(-1))
    }

    pub fn next(self) -> Height {
        Height(self.0 + 1)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Height {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: i64 = s
            .parse()
            .map_err(|_| TypeError::InvalidHeight(s.to_string()))?;
        if v < -1 {
            return Err(TypeError::InvalidHeight(s.to_string()));
        }
        Ok(Height(v))
    }
}

impl From<i64> for Height {
    fn from(v: i64) -> Self {
        Height::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        for h in [Height::NIL, Height::GENESIS, Height::new(42)] {
            let s = h.to_string();
            assert_eq!(s.parse::<Height>().unwrap(), h);
        }
    }

    #[test]
    fn prev_clamps_at_nil() {
        assert_eq!(Height::GENESIS.prev(), Height::NIL);
        assert_eq!(Height::NIL.prev(), Height::NIL);
        assert_eq!(Height::new(5).prev(), Height::new(4));
    }

    #[test]
    fn rejects_below_nil() {
        assert!("-2".parse::<Height>().is_err());
        assert!("abc".parse::<Height>().is_err());
    }
}
