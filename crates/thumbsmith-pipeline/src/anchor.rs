//! Anchor positions used by `fit` (crop position) and `resize_canvas`
//! (placement of the source on the new canvas).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// One of the nine reference points of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

/// Horizontal or vertical alignment along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Start,
    Middle,
    End,
}

impl Align {
    /// Offset of an `inner` span inside an `outer` span.
    ///
    /// Negative when `inner` is larger than `outer`.
    const fn offset(self, outer: i64, inner: i64) -> i64 {
        match self {
            Self::Start => 0,
            Self::Middle => (outer - inner) / 2,
            Self::End => outer - inner,
        }
    }
}

impl Anchor {
    /// All anchors, in row-major order.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Left,
        Self::Center,
        Self::Right,
        Self::BottomLeft,
        Self::Bottom,
        Self::BottomRight,
    ];

    /// Canonical lowercase name, also used in cache fingerprints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::Top => "top",
            Self::TopRight => "top-right",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::BottomLeft => "bottom-left",
            Self::Bottom => "bottom",
            Self::BottomRight => "bottom-right",
        }
    }

    const fn horizontal(self) -> Align {
        match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => Align::Start,
            Self::Top | Self::Center | Self::Bottom => Align::Middle,
            Self::TopRight | Self::Right | Self::BottomRight => Align::End,
        }
    }

    const fn vertical(self) -> Align {
        match self {
            Self::TopLeft | Self::Top | Self::TopRight => Align::Start,
            Self::Left | Self::Center | Self::Right => Align::Middle,
            Self::BottomLeft | Self::Bottom | Self::BottomRight => Align::End,
        }
    }

    /// Top-left offset that places an `inner` rectangle inside an `outer`
    /// one at this anchor.
    ///
    /// Offsets are negative on an axis where `inner` exceeds `outer`, so
    /// the same computation serves both padding and clipping.
    #[must_use]
    pub fn offset(self, outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
        (
            self.horizontal()
                .offset(i64::from(outer.0), i64::from(inner.0)),
            self.vertical().offset(i64::from(outer.1), i64::from(inner.1)),
        )
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.as_str() == normalized)
            .ok_or_else(|| PipelineError::invalid(format!("unknown anchor position '{s}'")))
    }
}
