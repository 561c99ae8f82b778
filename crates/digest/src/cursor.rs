//! Opaque pagination cursors.
//!
//! Operation lists order by the composite `(height, index)` key and encode
//! it as `"<height>,<index>"`; manifest lists order by bare height. Both
//! forms are comparable and round-trip through their string encoding.

use std::fmt;
use std::str::FromStr;

use vista_core::Height;

use crate::error::DigestError;

/// Position in an operation-oriented list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationCursor {
    pub height: Height,
    pub index: u32,
}

impl OperationCursor {
    pub fn new(height: Height, index: u32) -> Self {
        OperationCursor { height, index }
    }
}

impl fmt::Display for OperationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.height, self.index)
    }
}

impl FromStr for OperationCursor {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, i) = s
            .split_once(',')
            .ok_or_else(|| DigestError::Cursor(format!("missing comma: {s}")))?;
        let height: Height = h
            .parse()
            .map_err(|_| DigestError::Cursor(format!("bad height: {s}")))?;
        let index: u32 = i
            .parse()
            .map_err(|_| DigestError::Cursor(format!("bad index: {s}")))?;
        Ok(OperationCursor { height, index })
    }
}

/// Position in a manifest list: a bare height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeightCursor(pub Height);

impl fmt::Display for HeightCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HeightCursor {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let height: Height = s
            .parse()
            .map_err(|_| DigestError::Cursor(format!("bad height: {s}")))?;
        Ok(HeightCursor(height))
    }
}
