use crate::grid::idx;

/// Edge treatment applied after each relaxation sweep and after advection.
///
/// Replaces the integer flag convention (0..4) of classic stable-fluids
/// code: 0 = Neumann, 1 = negate-x, 2 = negate-y, 3 = clone-through
/// (periodic), 4 = zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Copy the adjacent interior cell onto the border (zero-gradient).
    Neumann,
    /// Negate the horizontal component at the left/right walls; Neumann at
    /// the top/bottom walls. Used for the u velocity component.
    NegateX,
    /// Negate the vertical component at the top/bottom walls; Neumann at
    /// the left/right walls. Used for the v velocity component.
    NegateY,
    /// Clone values through from the opposite interior edge (periodic).
    Wrap,
    /// Force the border cells to zero.
    Zero,
}

/// Enforce boundary conditions on the border cells of an n x n field.
///
/// Edges first, then the four corners. For the reflecting modes corners are
/// the average of the two adjacent edge cells; for `Wrap` they clone the
/// diagonally opposite interior cell; for `Zero` they are zeroed.
pub fn set_bnd(b: Boundary, x: &mut [f64], n: usize) {
    for i in 1..n - 1 {
        match b {
            Boundary::Neumann => {
                x[idx(0, i, n)] = x[idx(1, i, n)];
                x[idx(n - 1, i, n)] = x[idx(n - 2, i, n)];
                x[idx(i, 0, n)] = x[idx(i, 1, n)];
                x[idx(i, n - 1, n)] = x[idx(i, n - 2, n)];
            }
            Boundary::NegateX => {
                x[idx(0, i, n)] = -x[idx(1, i, n)];
                x[idx(n - 1, i, n)] = -x[idx(n - 2, i, n)];
                x[idx(i, 0, n)] = x[idx(i, 1, n)];
                x[idx(i, n - 1, n)] = x[idx(i, n - 2, n)];
            }
            Boundary::NegateY => {
                x[idx(0, i, n)] = x[idx(1, i, n)];
                x[idx(n - 1, i, n)] = x[idx(n - 2, i, n)];
                x[idx(i, 0, n)] = -x[idx(i, 1, n)];
                x[idx(i, n - 1, n)] = -x[idx(i, n - 2, n)];
            }
            Boundary::Wrap => {
                x[idx(0, i, n)] = x[idx(n - 2, i, n)];
                x[idx(n - 1, i, n)] = x[idx(1, i, n)];
                x[idx(i, 0, n)] = x[idx(i, n - 2, n)];
                x[idx(i, n - 1, n)] = x[idx(i, 1, n)];
            }
            Boundary::Zero => {
                x[idx(0, i, n)] = 0.0;
                x[idx(n - 1, i, n)] = 0.0;
                x[idx(i, 0, n)] = 0.0;
                x[idx(i, n - 1, n)] = 0.0;
            }
        }
    }

    match b {
        Boundary::Wrap => {
            x[idx(0, 0, n)] = x[idx(n - 2, n - 2, n)];
            x[idx(0, n - 1, n)] = x[idx(n - 2, 1, n)];
            x[idx(n - 1, 0, n)] = x[idx(1, n - 2, n)];
            x[idx(n - 1, n - 1, n)] = x[idx(1, 1, n)];
        }
        Boundary::Zero => {
            x[idx(0, 0, n)] = 0.0;
            x[idx(0, n - 1, n)] = 0.0;
            x[idx(n - 1, 0, n)] = 0.0;
            x[idx(n - 1, n - 1, n)] = 0.0;
        }
        _ => {
            x[idx(0, 0, n)] = 0.5 * (x[idx(1, 0, n)] + x[idx(0, 1, n)]);
            x[idx(0, n - 1, n)] = 0.5 * (x[idx(1, n - 1, n)] + x[idx(0, n - 2, n)]);
            x[idx(n - 1, 0, n)] = 0.5 * (x[idx(n - 2, 0, n)] + x[idx(n - 1, 1, n)]);
            x[idx(n - 1, n - 1, n)] =
                0.5 * (x[idx(n - 2, n - 1, n)] + x[idx(n - 1, n - 2, n)]);
        }
    }
}
