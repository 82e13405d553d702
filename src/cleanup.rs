//! Stroke cleanup around the optimizer.
//!
//! - [`merge_touching`] joins a stroke onto its predecessor when the pen
//!   would lift and drop at the same spot.
//! - [`remove_repeated_draws`] drops line segments that were already drawn,
//!   in either direction, earlier in the same stroke list.

use std::collections::HashSet;

use crate::geometry::{Point, Stroke};

/// Hashable identity of a point. `-0.0` and `0.0` map to the same key.
type PointKey = (u64, u64);

fn key(p: Point) -> PointKey {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Concatenates consecutive strokes whose junction has zero length.
///
/// Strokes are compared exactly: `prev.last() == next.first()`. The shared
/// point is kept once. Empty strokes are skipped.
pub fn merge_touching(strokes: &[Stroke]) -> Vec<Stroke> {
    let mut out: Vec<Stroke> = Vec::with_capacity(strokes.len());
    let mut current: Vec<Point> = Vec::new();

    for stroke in strokes.iter().filter(|s| !s.is_empty()) {
        let points = stroke.points();
        if !current.is_empty() && current.last().copied() == stroke.first() {
            current.extend_from_slice(&points[1..]);
        } else {
            if !current.is_empty() {
                out.push(Stroke::new(std::mem::take(&mut current)));
            }
            current.extend_from_slice(points);
        }
    }
    if !current.is_empty() {
        out.push(Stroke::new(current));
    }
    out
}

/// Removes segments already drawn earlier, then merges touching strokes.
///
/// A stroke containing a repeated segment is split around it. Pieces left
/// with fewer than two points are dropped.
pub fn remove_repeated_draws(strokes: &[Stroke]) -> Vec<Stroke> {
    let mut drawn: HashSet<(PointKey, PointKey)> = HashSet::new();
    let mut pieces: Vec<Stroke> = Vec::new();

    for stroke in strokes {
        let points = stroke.points();
        let Some(&first) = points.first() else {
            continue;
        };
        let mut piece = vec![first];

        for w in points.windows(2) {
            let (a, b) = (key(w[0]), key(w[1]));
            if drawn.contains(&(a, b)) || drawn.contains(&(b, a)) {
                if piece.len() > 1 {
                    pieces.push(Stroke::new(piece));
                }
                piece = vec![w[1]];
            } else {
                drawn.insert((a, b));
                piece.push(w[1]);
            }
        }
        if piece.len() > 1 {
            pieces.push(Stroke::new(piece));
        }
    }

    merge_touching(&pieces)
}
