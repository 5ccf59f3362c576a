//! 2D Eulerian fluid solvers on a square grid.
//!
//! Two solvers share a flat-array grid representation and a pluggable
//! iterative linear solver:
//!
//! - [`solver::StableFluids2D`]: Jos Stam style incompressible solver
//!   (implicit diffusion, semi-Lagrangian advection, pressure projection,
//!   optional vorticity confinement and buoyancy).
//! - [`solver::PracticalFluids2D`]: a faster compressible variant (explicit
//!   diffusion, gradient-push forces, mass-conserving forward/reverse
//!   advection).
//!
//! The caller seeds sources each frame, calls `update(dt)`, and reads the
//! density/velocity fields back for visualization. Rendering is out of
//! scope; see `src/bin/smoke_demo.rs` for a headless driver.

pub mod config;
pub mod grid;
pub mod solver;

pub use config::Config;
pub use grid::FieldPair;
pub use solver::{
    Boundary, ConjugateGradient, EulerianSolver2D, GaussSeidel, Jacobi, LinearSolver2D,
    PracticalFluids2D, PracticalParams, StableFluids2D, StableParams,
};
