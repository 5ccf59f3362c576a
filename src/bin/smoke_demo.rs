// src/bin/smoke_demo.rs
//
// Headless smoke plume: pulses density and an upward draft into both
// solvers and prints conservation/energy diagnostics on a cadence.
//
// Reads eulerflow.yaml from the working directory if present.

use eulerflow::solver::diagnostics::{field_total, kinetic_energy, max_divergence};
use eulerflow::{Config, EulerianSolver2D, PracticalFluids2D, StableFluids2D};

fn main() {
    env_logger::init();

    let config = Config::load_or_default("eulerflow.yaml");
    let n = config.grid_size;
    let dt = config.dt;
    let steps: usize = 300;
    let report_stride: usize = 30;

    let mut stable = StableFluids2D::with_params(
        n,
        config.stable.clone(),
        config.build_linear_solver(n),
    );
    let mut practical = PracticalFluids2D::with_params(
        n,
        config.practical.clone(),
        config.build_linear_solver(n),
    );

    // Source at the bottom center, drafting upward.
    let sx = n / 2;
    let sy = n / 4;

    println!("grid {}x{}, dt {}", n, n, dt);
    println!("step  solver     density_total  max_divergence  kinetic_energy");

    for step in 1..=steps {
        if step % 10 == 1 {
            stable.add_density(sx, sy, 100.0);
            stable.add_velocity(sx, sy, 0.0, 50.0);

            practical.add_density(sx as f64, sy as f64, 100.0);
            practical.add_heat(sx as f64, sy as f64, 5.0);
            practical.add_velocity(sx as f64, sy as f64, 0.0, 0.5);
        }

        stable.update(dt);
        practical.update(dt);

        if step % report_stride == 0 || step == steps {
            println!(
                "{:>4}  stable     {:>13.4}  {:>14.3e}  {:>14.3e}",
                step,
                field_total(stable.density()),
                max_divergence(stable.velocity_u(), stable.velocity_v(), n),
                kinetic_energy(stable.velocity_u(), stable.velocity_v(), n),
            );
            println!(
                "{:>4}  practical  {:>13.4}  {:>14.3e}  {:>14.3e}",
                step,
                field_total(practical.density()),
                max_divergence(practical.velocity_u(), practical.velocity_v(), n),
                kinetic_energy(practical.velocity_u(), practical.velocity_v(), n),
            );
        }
    }
}
