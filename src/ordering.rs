//! Orderings for tools with constraints annealing does not know about.
//!
//! - [`directionalize`] keeps the stroke order but splits every stroke into
//!   runs that are monotone along a fixed direction and draws each run that
//!   way. Slanted pens and drag knives prefer one drawing direction.
//! - [`sort_inside_out`] puts paths nested in a closed path before it, and
//!   closed paths before open ones, so a cutter frees inner pieces before
//!   the piece around them.

use std::cmp::Ordering;

use crate::geometry::{Point, Stroke};

/// Projections within this distance of zero count as perpendicular.
const DIRECTION_TOLERANCE: f64 = 1e-10;

/// A path whose ends are at most this far apart is treated as closed.
pub const CLOSE_TOLERANCE: f64 = 0.05;

/// Points of one path tested against another path for nesting.
const NESTING_SAMPLES: usize = 3;

/// Splits strokes into runs drawn along `degrees` (0 is +x, 90 is +y).
///
/// A run ends where the stroke turns back against the direction; the
/// vertex at the turn is shared by both runs. Runs moving against the
/// direction are reversed. Segments perpendicular to the direction do not
/// end a run, and a stroke that is perpendicular throughout is kept as is.
/// Empty strokes are skipped.
pub fn directionalize(strokes: &[Stroke], degrees: f64) -> Vec<Stroke> {
    let (dy, dx) = degrees.to_radians().sin_cos();
    let mut out = Vec::with_capacity(strokes.len());

    for stroke in strokes {
        let points = stroke.points();
        let Some(&first) = points.first() else {
            continue;
        };
        let mut start = 0;
        let mut prev = first;
        let mut can_forward = true;
        let mut can_reverse = true;

        for (i, &p) in points.iter().enumerate().skip(1) {
            let (vx, vy) = (p.x - prev.x, p.y - prev.y);
            if vx == 0.0 && vy == 0.0 {
                continue;
            }
            let dot = vx * dx + vy * dy;
            if dot > DIRECTION_TOLERANCE {
                if !can_forward {
                    out.push(run(&points[start..i], true));
                    start = i - 1;
                    can_forward = true;
                }
                can_reverse = false;
            } else if dot < -DIRECTION_TOLERANCE {
                if !can_reverse {
                    out.push(run(&points[start..i], false));
                    start = i - 1;
                    can_reverse = true;
                }
                can_forward = false;
            }
            prev = p;
        }
        out.push(run(&points[start..], !can_forward));
    }
    out
}

fn run(points: &[Point], reverse: bool) -> Stroke {
    Stroke::new(points.to_vec()).oriented(reverse)
}

/// A stroke prepared for nesting comparisons.
struct Outline {
    /// Points, with the first point appended when the ends nearly meet.
    ring: Vec<Point>,
    closed: bool,
    mean_x: f64,
}

impl Outline {
    fn new(stroke: &Stroke) -> Self {
        let mut ring = stroke.points().to_vec();
        if let (Some(first), Some(last)) = (stroke.first(), stroke.last()) {
            if first != last && first.distance(last) <= CLOSE_TOLERANCE {
                ring.push(first);
            }
        }
        let closed = !ring.is_empty() && ring.first() == ring.last();
        let mean_x = if ring.is_empty() {
            0.0
        } else {
            ring.iter().map(|p| p.x).sum::<f64>() / ring.len() as f64
        };
        Self { ring, closed, mean_x }
    }

    /// True if `p` lies strictly inside this path. Vertices count as
    /// outside.
    fn contains(&self, p: Point) -> bool {
        !self.ring.contains(&p) && winding_number(p, &self.ring) != 0
    }

    /// True if this path sits inside the closed path `outer`, judged on a
    /// few evenly spaced sample points.
    fn nested_in(&self, outer: &Outline) -> bool {
        if !outer.closed {
            return false;
        }
        let n = self.ring.len();
        let k = NESTING_SAMPLES.min(n);
        (0..k).any(|s| outer.contains(self.ring[s * n / k]))
    }
}

/// Winding number of the closed ring around `p`.
fn winding_number(p: Point, ring: &[Point]) -> i32 {
    let side = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
    let mut winding = 0;
    for w in ring.windows(2) {
        let (a, b) = (w[0], w[1]);
        if a.y <= p.y {
            if b.y > p.y && side(a, b) > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side(a, b) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Inner before outer, closed before open, otherwise left to right by
/// mean x. Not transitive in general.
fn compare_outlines(a: &Outline, b: &Outline) -> Ordering {
    if a.nested_in(b) {
        Ordering::Less
    } else if b.nested_in(a) {
        Ordering::Greater
    } else if a.closed != b.closed {
        if a.closed {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else {
        a.mean_x.total_cmp(&b.mean_x)
    }
}

/// Orders strokes from the inside out for cutting.
///
/// Paths nested inside a closed path come before it, closed paths come
/// before open ones, and the rest go left to right. Ties keep the input
/// order.
pub fn sort_inside_out(strokes: Vec<Stroke>) -> Vec<Stroke> {
    let keyed: Vec<(Outline, Stroke)> = strokes
        .into_iter()
        .map(|stroke| (Outline::new(&stroke), stroke))
        .collect();
    let mut cmp = |a: &(Outline, Stroke), b: &(Outline, Stroke)| compare_outlines(&a.0, &b.0);
    merge_sort(keyed, &mut cmp)
        .into_iter()
        .map(|(_, stroke)| stroke)
        .collect()
}

/// Stable top-down merge sort. The nesting comparison is not a total
/// order, which `slice::sort_by` may reject by panicking.
fn merge_sort<T, F>(mut items: Vec<T>, cmp: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(items, cmp).into_iter().peekable();
    let mut right = merge_sort(right, cmp).into_iter().peekable();

    let mut out = Vec::with_capacity(left.len() + right.len());
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => cmp(a, b) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
    out
}
