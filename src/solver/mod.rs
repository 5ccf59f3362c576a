mod boundary;
pub mod diagnostics;
mod linear;
mod params;
mod practical;
mod stable;

// Re-export public API
pub use boundary::{set_bnd, Boundary};
pub use linear::{ConjugateGradient, GaussSeidel, Jacobi, LinearSolver2D};
pub use params::{PracticalParams, StableParams};
pub use practical::PracticalFluids2D;
pub use stable::StableFluids2D;

/// Common surface of the two fluid solvers. Callers seed sources through
/// the solver-specific `add_*` methods, step with [`update`](Self::update),
/// and read the fields back for visualization.
pub trait EulerianSolver2D {
    /// Side length of the square grid.
    fn resolution(&self) -> usize;

    /// Zero all fields back to their initial values.
    fn reset(&mut self);

    /// Advance the simulation by `dt`.
    fn update(&mut self, dt: f64);

    /// Current density field, row-major n x n.
    fn density(&self) -> &[f64];

    /// Current horizontal velocity component, row-major n x n.
    fn velocity_u(&self) -> &[f64];

    /// Current vertical velocity component, row-major n x n.
    fn velocity_v(&self) -> &[f64];
}
