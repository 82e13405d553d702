//! Arrangement of strokes and the block-reversal move.

use crate::geometry::Stroke;

/// A permutation of strokes plus a per-slot orientation flag.
///
/// `order[p]` is the index into the borrowed stroke slice of the stroke
/// drawn at slot `p`, and `reversed[p]` tells whether that slot draws it
/// end-to-start. The strokes themselves are never touched.
#[derive(Debug, Clone)]
pub struct Arrangement<'a> {
    strokes: &'a [Stroke],
    order: Vec<usize>,
    reversed: Vec<bool>,
}

/// Copy of an arrangement's order and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub order: Vec<usize>,
    pub reversed: Vec<bool>,
}

impl<'a> Arrangement<'a> {
    /// Input order, all flags cleared.
    pub fn new(strokes: &'a [Stroke]) -> Self {
        Self {
            strokes,
            order: (0..strokes.len()).collect(),
            reversed: vec![false; strokes.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn reversed(&self) -> &[bool] {
        &self.reversed
    }

    /// Travel cost of the junction between slot `p` and slot `p + 1`.
    ///
    /// Zero for the last slot and beyond.
    #[inline]
    pub fn junction(&self, p: usize) -> f64 {
        if p + 1 >= self.order.len() {
            return 0.0;
        }
        let end = self.strokes[self.order[p]].end(self.reversed[p]);
        let start = self.strokes[self.order[p + 1]].start(self.reversed[p + 1]);
        end.distance(start)
    }

    /// Sum of the two junctions bounding the block `i..=j`.
    #[inline]
    pub fn boundary_energy(&self, i: usize, j: usize) -> f64 {
        let before = if i == 0 { 0.0 } else { self.junction(i - 1) };
        before + self.junction(j)
    }

    /// Total travel energy, recomputed from scratch.
    pub fn energy(&self) -> f64 {
        (0..self.order.len().saturating_sub(1))
            .map(|p| self.junction(p))
            .sum()
    }

    /// Swaps the strokes at slots `i` and `j`, each taking the negation of
    /// the other's flag. With `i == j` this flips a single flag.
    ///
    /// Self-inverse. After this, slots `i` and `j` hold exactly what a
    /// full [`reverse_block`](Self::reverse_block) would put there, so the
    /// boundary junctions already have their post-move values.
    #[inline]
    pub fn swap_ends(&mut self, i: usize, j: usize) {
        self.order.swap(i, j);
        let (ri, rj) = (self.reversed[i], self.reversed[j]);
        self.reversed[i] = !rj;
        self.reversed[j] = !ri;
    }

    /// Finishes a block reversal started with [`swap_ends`](Self::swap_ends)
    /// by reversing and flipping the slots strictly between `i` and `j`.
    #[inline]
    pub fn reverse_interior(&mut self, i: usize, j: usize) {
        if j > i + 1 {
            self.reverse_block(i + 1, j - 1);
        }
    }

    /// Reverses slots `i..=j` and flips every flag in the range.
    ///
    /// Self-inverse. Junctions inside the block keep their cost; only
    /// the junctions at `i - 1` and `j` change.
    pub fn reverse_block(&mut self, i: usize, j: usize) {
        debug_assert!(i <= j && j < self.order.len());
        self.order[i..=j].reverse();
        let flags = &mut self.reversed[i..=j];
        flags.reverse();
        for flag in flags {
            *flag = !*flag;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            order: self.order.clone(),
            reversed: self.reversed.clone(),
        }
    }

    /// Restores a snapshot taken from this arrangement.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.order.clone_from(&snapshot.order);
        self.reversed.clone_from(&snapshot.reversed);
    }
}

impl Snapshot {
    /// Moves the strokes into snapshot order, physically reversing the
    /// flagged ones.
    ///
    /// `strokes` must be the slice the snapshot was taken over.
    pub fn materialize(&self, strokes: Vec<Stroke>) -> Vec<Stroke> {
        let mut slots: Vec<Option<Stroke>> = strokes.into_iter().map(Some).collect();
        self.order
            .iter()
            .zip(&self.reversed)
            .filter_map(|(&idx, &rev)| slots[idx].take().map(|s| s.oriented(rev)))
            .collect()
    }
}
