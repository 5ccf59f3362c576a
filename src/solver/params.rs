use serde::{Deserialize, Serialize};

/// Tuning knobs for [`StableFluids2D`](crate::solver::StableFluids2D).
///
/// The defaults reproduce the classic inviscid smoke setup: zero viscosity
/// and diffusion, 20 relaxation sweeps for both diffusion and projection,
/// confinement and buoyancy off.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StableParams {
    /// Kinematic viscosity of the velocity field.
    pub visc: f64,
    /// Diffusion rate of the density field.
    pub diff: f64,
    /// Relaxation sweeps for the implicit diffusion solve.
    pub diffusion_iterations: usize,
    /// Relaxation sweeps for the pressure Poisson solve.
    pub projection_iterations: usize,
    /// Enable vorticity confinement plus the paired buoyancy force.
    pub vorticity_confinement: bool,
    /// Buoyancy lift per unit density.
    pub buoyancy_a: f64,
    /// Buoyancy pull toward the ambient (grid average) density.
    pub buoyancy_b: f64,
}

impl Default for StableParams {
    fn default() -> Self {
        Self {
            visc: 0.0,
            diff: 0.0,
            diffusion_iterations: 20,
            projection_iterations: 20,
            vorticity_confinement: false,
            buoyancy_a: 0.000625,
            buoyancy_b: 0.025,
        }
    }
}

/// Tuning knobs for [`PracticalFluids2D`](crate::solver::PracticalFluids2D).
///
/// Defaults are the smoke-in-air tuning: diffusing velocity and pressure,
/// pressure acceleration 2.0, heat pulling upward at -0.1, everything else
/// off. Diffusion rates of exactly 0.0 skip the whole pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticalParams {
    /// Velocity diffusion rate.
    pub velocity_diffusion: f64,
    /// Pressure diffusion rate. Too large smears pressure waves flat.
    pub pressure_diffusion: f64,
    /// Heat diffusion rate.
    pub heat_diffusion: f64,
    /// Density diffusion rate.
    pub density_diffusion: f64,
    /// How strongly pressure differentials accelerate the velocity field.
    /// Large values (>10) behave like water; too large turns chaotic.
    pub pressure_acceleration: f64,
    /// Vorticity confinement strength. 0.0 disables the pass.
    pub vorticity: f64,
    /// Upward force per unit density (smoke rising under its own steam).
    pub density_force: f64,
    /// Gradient force from the heat field. Negative pulls velocity toward
    /// hot cells. 0.0 disables heat entirely, including its advection.
    pub heat_force: f64,
    /// Exponential heat decay per unit time.
    pub heat_decay: f64,
    /// Exponential velocity decay per unit time (plays the role of
    /// viscosity).
    pub velocity_decay: f64,
    /// Advection distance scales per field, in cells per unit velocity per
    /// unit time before grid-size normalization.
    pub density_advection: f64,
    pub velocity_advection: f64,
    pub pressure_advection: f64,
    pub heat_advection: f64,
    /// Explicit diffusion sub-steps per update; each uses rate/iterations.
    pub diffusion_iterations: usize,
    /// Value the pressure field is reset to. 1.0 behaves like air; lower
    /// is more gas-like, higher less compressible.
    pub initial_pressure: f64,
    /// Value the heat field is reset to.
    pub initial_heat: f64,
}

impl Default for PracticalParams {
    fn default() -> Self {
        Self {
            velocity_diffusion: 1.0,
            pressure_diffusion: 10.0,
            heat_diffusion: 0.0,
            density_diffusion: 0.0,
            pressure_acceleration: 2.0,
            vorticity: 0.0,
            density_force: 0.0,
            heat_force: -0.1,
            heat_decay: 0.0,
            velocity_decay: 0.0,
            density_advection: 150.0,
            velocity_advection: 150.0,
            pressure_advection: 150.0,
            heat_advection: 150.0,
            diffusion_iterations: 1,
            initial_pressure: 0.0,
            initial_heat: 0.0,
        }
    }
}
