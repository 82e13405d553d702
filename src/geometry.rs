//! Points and strokes.
//!
//! A [`Stroke`] is one continuous pen-down path. The optimizer only ever
//! looks at its two ends; interior points are carried through untouched.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D point in drawing units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// One continuous pen-down path.
///
/// Strokes handed to the optimizer must have at least two points; use
/// [`Stroke::validate`] or let the runner reject them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Builds a stroke from `(x, y)` pairs.
    pub fn from_coords<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self::new(coords.into_iter().map(Point::from).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point, if any.
    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Last point, if any.
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Start point as traversed with the given orientation.
    ///
    /// Only meaningful on validated strokes; an empty stroke yields the
    /// origin.
    #[inline]
    pub fn start(&self, reversed: bool) -> Point {
        let p = if reversed {
            self.points.last()
        } else {
            self.points.first()
        };
        p.copied().unwrap_or_default()
    }

    /// End point as traversed with the given orientation.
    #[inline]
    pub fn end(&self, reversed: bool) -> Point {
        self.start(!reversed)
    }

    /// Returns a copy with the point order reversed.
    pub fn reversed(&self) -> Stroke {
        let mut points = self.points.clone();
        points.reverse();
        Stroke { points }
    }

    /// Consumes the stroke, reversing it in place when `reverse` is set.
    pub fn oriented(mut self, reverse: bool) -> Stroke {
        if reverse {
            self.points.reverse();
        }
        self
    }

    /// Pen-down length along the stroke.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// True if `other` has the same points, in either direction.
    pub fn same_path(&self, other: &Stroke) -> bool {
        self.points == other.points
            || (self.points.len() == other.points.len()
                && self.points.iter().eq(other.points.iter().rev()))
    }

    /// Checks that the stroke can be handed to the optimizer.
    ///
    /// `index` is only used to label the error.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.points.len() < 2 {
            return Err(Error::InvalidInput {
                index,
                points: self.points.len(),
            });
        }
        if !self.points.iter().all(|p| p.is_finite()) {
            return Err(Error::NonFinite { index });
        }
        Ok(())
    }
}

impl From<Vec<Point>> for Stroke {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point> for Stroke {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Total pen-up distance when drawing `strokes` in the given order and
/// orientation.
pub fn travel_distance(strokes: &[Stroke]) -> f64 {
    strokes
        .windows(2)
        .map(|w| w[0].end(false).distance(w[1].start(false)))
        .sum()
}

/// Total pen-down distance over all strokes.
pub fn draw_distance(strokes: &[Stroke]) -> f64 {
    strokes.iter().map(Stroke::length).sum()
}
