//! YAML configuration for the demo binaries. Every field has a default, so
//! a partial file (or none at all) is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::solver::{
    ConjugateGradient, GaussSeidel, Jacobi, LinearSolver2D, PracticalParams, StableParams,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Side length of the square simulation grid.
    pub grid_size: usize,
    /// Simulation time step.
    pub dt: f64,
    pub linear_solver: LinearSolverConfig,
    pub stable: StableParams,
    pub practical: PracticalParams,
}

/// Which relaxation strategy the fluid solvers are given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearSolverConfig {
    GaussSeidel,
    Jacobi {
        #[serde(default = "default_relaxation")]
        relaxation: f64,
    },
    ConjugateGradient {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
}

fn default_relaxation() -> f64 {
    1.1
}

fn default_tolerance() -> f64 {
    1e-3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: 128,
            dt: 0.1,
            linear_solver: LinearSolverConfig::GaussSeidel,
            stable: StableParams::default(),
            practical: PracticalParams::default(),
        }
    }
}

impl Config {
    /// Load from a YAML file, failing loudly.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Load from a YAML file if it exists, falling back to defaults on a
    /// missing or broken file.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("{}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Build the configured linear solver for an n x n grid.
    pub fn build_linear_solver(&self, n: usize) -> Box<dyn LinearSolver2D> {
        match self.linear_solver {
            LinearSolverConfig::GaussSeidel => Box::new(GaussSeidel::new(n)),
            LinearSolverConfig::Jacobi { relaxation } => {
                Box::new(Jacobi::with_relaxation(n, relaxation))
            }
            LinearSolverConfig::ConjugateGradient { tolerance } => {
                Box::new(ConjugateGradient::with_tolerance(n, tolerance))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.grid_size, 128);
        assert_eq!(cfg.dt, 0.1);
        assert!(matches!(cfg.linear_solver, LinearSolverConfig::GaussSeidel));
        assert_eq!(cfg.stable.diffusion_iterations, 20);
        assert_eq!(cfg.practical.pressure_acceleration, 2.0);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "grid_size: 64\nstable:\n  visc: 0.01\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.grid_size, 64);
        assert_eq!(cfg.stable.visc, 0.01);
        assert_eq!(cfg.dt, 0.1); // default
        assert_eq!(cfg.stable.diff, 0.0); // default
        assert_eq!(cfg.practical.heat_force, -0.1); // default
    }

    #[test]
    fn test_solver_selection_yaml() {
        let yaml = "linear_solver:\n  kind: jacobi\n  relaxation: 1.3\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        match cfg.linear_solver {
            LinearSolverConfig::Jacobi { relaxation } => assert_eq!(relaxation, 1.3),
            other => panic!("expected jacobi, got {:?}", other),
        }

        let yaml = "linear_solver:\n  kind: conjugate_gradient\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        match cfg.linear_solver {
            LinearSolverConfig::ConjugateGradient { tolerance } => assert_eq!(tolerance, 1e-3),
            other => panic!("expected conjugate gradient, got {:?}", other),
        }
    }

    #[test]
    fn test_build_linear_solver_resolution() {
        let cfg = Config::default();
        let solver = cfg.build_linear_solver(32);
        assert_eq!(solver.resolution(), 32);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let cfg = Config::load_or_default("does-not-exist.yaml");
        assert_eq!(cfg.grid_size, 128);
    }
}
