//! Flat row-major storage for square 2D fields.

/// Row-major index into an n x n field: `idx(x, y, n) = y*n + x`.
/// Callers guarantee `0 <= x, y < n`.
#[inline(always)]
pub const fn idx(x: usize, y: usize, n: usize) -> usize {
    y * n + x
}

/// Double-buffered scalar field.
///
/// `cur` holds the present values, `old` holds the previous step or
/// externally injected sources. Each physical quantity (velocity component,
/// density, pressure, heat) is one pair; the solvers ping-pong between the
/// two buffers with an explicit [`swap`](FieldPair::swap) instead of
/// reassigning arrays ad hoc.
#[derive(Clone, Debug, Default)]
pub struct FieldPair {
    pub cur: Vec<f64>,
    pub old: Vec<f64>,
}

impl FieldPair {
    /// Allocate both buffers zero-filled.
    pub fn new(size: usize) -> Self {
        Self {
            cur: vec![0.0; size],
            old: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.cur.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cur.is_empty()
    }

    /// Exchange the two buffers. O(1), no copying.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.cur, &mut self.old);
    }

    /// Zero both buffers in place.
    pub fn clear(&mut self) {
        self.cur.fill(0.0);
        self.old.fill(0.0);
    }

    /// Zero the source buffer in place (done after each step once the
    /// injected sources have been consumed).
    pub fn clear_old(&mut self) {
        self.old.fill(0.0);
    }

    /// Set every cell of the current buffer to `value`.
    pub fn fill_cur(&mut self, value: f64) {
        self.cur.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idx_row_major() {
        let n = 8;
        assert_eq!(idx(0, 0, n), 0);
        assert_eq!(idx(1, 0, n), 1);
        assert_eq!(idx(0, 1, n), n);
        assert_eq!(idx(n - 1, n - 1, n), n * n - 1);
    }

    #[test]
    fn test_pair_new_zeroed() {
        let pair = FieldPair::new(16);
        assert_eq!(pair.len(), 16);
        assert!(pair.cur.iter().all(|&v| v == 0.0));
        assert!(pair.old.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pair_swap_exchanges_buffers() {
        let mut pair = FieldPair::new(4);
        pair.cur[0] = 1.0;
        pair.old[0] = 2.0;
        pair.swap();
        assert_eq!(pair.cur[0], 2.0, "old buffer should become current");
        assert_eq!(pair.old[0], 1.0, "current buffer should become old");
    }

    #[test]
    fn test_pair_swap_keeps_capacity() {
        let mut pair = FieldPair::new(4);
        let cur_ptr = pair.cur.as_ptr();
        pair.swap();
        assert_eq!(pair.old.as_ptr(), cur_ptr, "swap must move, not reallocate");
    }

    #[test]
    fn test_pair_clear_old_only() {
        let mut pair = FieldPair::new(4);
        pair.cur.fill(3.0);
        pair.old.fill(7.0);
        pair.clear_old();
        assert!(pair.old.iter().all(|&v| v == 0.0));
        assert!(pair.cur.iter().all(|&v| v == 3.0), "clear_old must not touch cur");
    }
}
