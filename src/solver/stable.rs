//! Jos Stam style incompressible solver with optional vorticity confinement
//! and buoyancy.
//!
//! Each step: inject sources, (optionally) add confinement and buoyancy
//! forces, diffuse velocity implicitly, project to a divergence-free field,
//! self-advect, project again, then diffuse and advect the density along
//! the result.

use crate::grid::{idx, FieldPair};
use crate::solver::boundary::{set_bnd, Boundary};
use crate::solver::linear::LinearSolver2D;
use crate::solver::params::StableParams;
use crate::solver::EulerianSolver2D;

pub struct StableFluids2D {
    n: usize,
    size: usize,
    pub params: StableParams,
    pub u: FieldPair,
    pub v: FieldPair,
    pub d: FieldPair,
    curl: Vec<f64>,
    solver: Box<dyn LinearSolver2D>,
}

impl StableFluids2D {
    pub fn new(n: usize, solver: Box<dyn LinearSolver2D>) -> Self {
        Self::with_params(n, StableParams::default(), solver)
    }

    pub fn with_params(n: usize, params: StableParams, solver: Box<dyn LinearSolver2D>) -> Self {
        debug_assert_eq!(solver.resolution(), n);
        log::debug!("stable solver: n={}, visc={}, diff={}", n, params.visc, params.diff);
        let size = n * n;
        Self {
            n,
            size,
            params,
            u: FieldPair::new(size),
            v: FieldPair::new(size),
            d: FieldPair::new(size),
            curl: vec![0.0; size],
            solver,
        }
    }

    /// Inject velocity at a cell; consumed (scaled by dt) on the next update.
    pub fn add_velocity(&mut self, x: usize, y: usize, du: f64, dv: f64) {
        let k = idx(x, y, self.n);
        self.u.old[k] += du;
        self.v.old[k] += dv;
    }

    /// Inject density at a cell; consumed (scaled by dt) on the next update.
    pub fn add_density(&mut self, x: usize, y: usize, amount: f64) {
        self.d.old[idx(x, y, self.n)] += amount;
    }

    fn update_velocity(&mut self, dt: f64) {
        let n = self.n;

        add_source(&mut self.u.cur, &self.u.old, dt);
        add_source(&mut self.v.cur, &self.v.old, dt);

        if self.params.vorticity_confinement {
            confine_vorticity(
                &mut self.u.old,
                &mut self.v.old,
                &mut self.curl,
                &self.u.cur,
                &self.v.cur,
                n,
            );
            add_source(&mut self.u.cur, &self.u.old, dt);
            add_source(&mut self.v.cur, &self.v.old, dt);

            buoyancy(
                &mut self.v.old,
                &self.d.cur,
                self.params.buoyancy_a,
                self.params.buoyancy_b,
                n,
            );
            add_source(&mut self.v.cur, &self.v.old, dt);
        }

        self.u.swap();
        diffuse(
            Boundary::Neumann,
            &mut self.u.cur,
            &self.u.old,
            self.params.visc,
            dt,
            self.params.diffusion_iterations,
            self.solver.as_ref(),
            n,
        );

        self.v.swap();
        diffuse(
            Boundary::Neumann,
            &mut self.v.cur,
            &self.v.old,
            self.params.visc,
            dt,
            self.params.diffusion_iterations,
            self.solver.as_ref(),
            n,
        );

        project(
            &mut self.u.cur,
            &mut self.v.cur,
            &mut self.u.old,
            &mut self.v.old,
            self.params.projection_iterations,
            self.solver.as_ref(),
            n,
        );

        self.u.swap();
        self.v.swap();

        advect(
            Boundary::NegateX,
            &mut self.u.cur,
            &self.u.old,
            &self.u.old,
            &self.v.old,
            dt,
            n,
        );
        advect(
            Boundary::NegateY,
            &mut self.v.cur,
            &self.v.old,
            &self.u.old,
            &self.v.old,
            dt,
            n,
        );

        project(
            &mut self.u.cur,
            &mut self.v.cur,
            &mut self.u.old,
            &mut self.v.old,
            self.params.projection_iterations,
            self.solver.as_ref(),
            n,
        );

        self.u.clear_old();
        self.v.clear_old();
    }

    fn update_density(&mut self, dt: f64) {
        let n = self.n;

        add_source(&mut self.d.cur, &self.d.old, dt);
        self.d.swap();

        diffuse(
            Boundary::Neumann,
            &mut self.d.cur,
            &self.d.old,
            self.params.diff,
            dt,
            self.params.diffusion_iterations,
            self.solver.as_ref(),
            n,
        );
        self.d.swap();

        advect(
            Boundary::Neumann,
            &mut self.d.cur,
            &self.d.old,
            &self.u.cur,
            &self.v.cur,
            dt,
            n,
        );

        self.d.clear_old();
    }
}

impl EulerianSolver2D for StableFluids2D {
    fn resolution(&self) -> usize {
        self.n
    }

    fn reset(&mut self) {
        self.u.clear();
        self.v.clear();
        self.d.clear();
        self.curl.fill(0.0);
        debug_assert_eq!(self.u.len(), self.size);
    }

    fn update(&mut self, dt: f64) {
        self.update_velocity(dt);
        self.update_density(dt);
    }

    fn density(&self) -> &[f64] {
        &self.d.cur
    }

    fn velocity_u(&self) -> &[f64] {
        &self.u.cur
    }

    fn velocity_v(&self) -> &[f64] {
        &self.v.cur
    }
}

/// x += dt * sources.
fn add_source(x: &mut [f64], sources: &[f64], dt: f64) {
    for (xi, si) in x.iter_mut().zip(sources) {
        *xi += dt * si;
    }
}

/// Implicit diffusion: solve for the field which, diffused backward in
/// time, yields the input. a = dt * rate * (n-2)^2, c = 1 + 4a.
fn diffuse(
    b: Boundary,
    x: &mut [f64],
    x0: &[f64],
    rate: f64,
    dt: f64,
    iterations: usize,
    solver: &dyn LinearSolver2D,
    n: usize,
) {
    let a = dt * rate * ((n - 2) * (n - 2)) as f64;
    // Initial guess: the input field itself.
    x.copy_from_slice(x0);
    solver.solve(b, iterations, x, x0, a, 1.0 + 4.0 * a);
}

/// Semi-Lagrangian advection: trace each cell center backwards through the
/// velocity field, clamp to the interior, and bilinearly interpolate from
/// the previous field.
fn advect(b: Boundary, d: &mut [f64], d0: &[f64], du: &[f64], dv: &[f64], dt: f64, n: usize) {
    let dt0 = dt * (n - 2) as f64;
    let n_f = n as f64;

    for i in 1..n - 1 {
        for j in 1..n - 1 {
            let x = (i as f64 - dt0 * du[idx(i, j, n)]).clamp(0.5, n_f - 1.5);
            let y = (j as f64 - dt0 * dv[idx(i, j, n)]).clamp(0.5, n_f - 1.5);

            let i0 = x as usize;
            let i1 = i0 + 1;
            let j0 = y as usize;
            let j1 = j0 + 1;

            let s1 = x - i0 as f64;
            let s0 = 1.0 - s1;
            let t1 = y - j0 as f64;
            let t0 = 1.0 - t1;

            d[idx(i, j, n)] = s0 * (t0 * d0[idx(i0, j0, n)] + t1 * d0[idx(i0, j1, n)])
                + s1 * (t0 * d0[idx(i1, j0, n)] + t1 * d0[idx(i1, j1, n)]);
        }
    }
    set_bnd(b, d, n);
}

/// Hodge decomposition: compute the divergence of (x, y), solve the Poisson
/// equation for a height field, and subtract its gradient to leave a mass
/// conserving velocity field.
fn project(
    x: &mut [f64],
    y: &mut [f64],
    p: &mut [f64],
    div: &mut [f64],
    iterations: usize,
    solver: &dyn LinearSolver2D,
    n: usize,
) {
    let h = (n - 2) as f64;

    for i in 1..n - 1 {
        for j in 1..n - 1 {
            div[idx(i, j, n)] = (x[idx(i + 1, j, n)] - x[idx(i - 1, j, n)] + y[idx(i, j + 1, n)]
                - y[idx(i, j - 1, n)])
                * -0.5
                / h;
            p[idx(i, j, n)] = 0.0;
        }
    }

    set_bnd(Boundary::Neumann, div, n);
    set_bnd(Boundary::Neumann, p, n);

    solver.solve(Boundary::Neumann, iterations, p, div, 1.0, 4.0);

    for i in 1..n - 1 {
        for j in 1..n - 1 {
            x[idx(i, j, n)] -= 0.5 * h * (p[idx(i + 1, j, n)] - p[idx(i - 1, j, n)]);
            y[idx(i, j, n)] -= 0.5 * h * (p[idx(i, j + 1, n)] - p[idx(i, j - 1, n)]);
        }
    }

    set_bnd(Boundary::NegateX, x, n);
    set_bnd(Boundary::NegateY, y, n);
}

/// Curl of the velocity field at (i, j); the vortex strength at the cell.
fn curl_at(u: &[f64], v: &[f64], i: usize, j: usize, n: usize) -> f64 {
    let du_dy = (u[idx(i, j + 1, n)] - u[idx(i, j - 1, n)]) * 0.5;
    let dv_dx = (v[idx(i + 1, j, n)] - v[idx(i - 1, j, n)]) * 0.5;
    du_dy - dv_dx
}

/// Vorticity confinement force: Fvc = N x w, where w is the curl and N the
/// normalized gradient of its magnitude (pointing at the vortex center).
/// Writes the force field into (fx, fy).
fn confine_vorticity(
    fx: &mut [f64],
    fy: &mut [f64],
    curl: &mut [f64],
    u: &[f64],
    v: &[f64],
    n: usize,
) {
    for i in 1..n - 1 {
        for j in 1..n - 1 {
            curl[idx(i, j, n)] = curl_at(u, v, i, j, n).abs();
        }
    }

    for i in 2..n - 2 {
        for j in 2..n - 2 {
            let mut dw_dx = (curl[idx(i + 1, j, n)] - curl[idx(i - 1, j, n)]) * 0.5;
            let mut dw_dy = (curl[idx(i, j + 1, n)] - curl[idx(i, j - 1, n)]) * 0.5;

            // Small factor prevents divide by zero.
            let length = (dw_dx * dw_dx + dw_dy * dw_dy).sqrt() + 0.000001;
            dw_dx /= length;
            dw_dy /= length;

            let vorticity = curl_at(u, v, i, j, n);

            fx[idx(i, j, n)] = dw_dy * -vorticity;
            fy[idx(i, j, n)] = dw_dx * vorticity;
        }
    }
}

/// Buoyancy force: Fbuoy = a*d - b*(d - Tamb), where Tamb is the average
/// density over the interior. Density doubles as temperature (smoke is
/// hot), so hot cells rise and the rest settles toward ambient.
fn buoyancy(fbuoy: &mut [f64], d: &[f64], a: f64, b: f64, n: usize) {
    let mut t_amb = 0.0;
    for i in 1..n - 1 {
        for j in 1..n - 1 {
            t_amb += d[idx(i, j, n)];
        }
    }
    t_amb /= ((n - 2) * (n - 2)) as f64;

    for i in 1..n - 1 {
        for j in 1..n - 1 {
            let k = idx(i, j, n);
            fbuoy[k] = a * d[k] - b * (d[k] - t_amb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::linear::GaussSeidel;

    const N: usize = 16;

    fn solver() -> StableFluids2D {
        StableFluids2D::new(N, Box::new(GaussSeidel::new(N)))
    }

    #[test]
    fn test_diffuse_spreads_spike() {
        let mut x0 = vec![0.0; N * N];
        x0[idx(N / 2, N / 2, N)] = 100.0;
        let mut x = vec![0.0; N * N];
        let gs = GaussSeidel::new(N);

        diffuse(Boundary::Neumann, &mut x, &x0, 0.1, 0.1, 20, &gs, N);

        let center = x[idx(N / 2, N / 2, N)];
        let neighbor = x[idx(N / 2 + 1, N / 2, N)];
        assert!(center < 100.0, "spike should flatten: {}", center);
        assert!(neighbor > 0.0, "neighbors should gain value");
        assert!(center > neighbor, "center should stay the maximum");
    }

    #[test]
    fn test_advect_zero_velocity_preserves() {
        let mut d0 = vec![0.0; N * N];
        for j in 1..N - 1 {
            for i in 1..N - 1 {
                d0[idx(i, j, N)] = (i * j) as f64;
            }
        }
        let mut d = vec![0.0; N * N];
        let zero = vec![0.0; N * N];

        advect(Boundary::Neumann, &mut d, &d0, &zero, &zero, 0.1, N);

        for j in 2..N - 2 {
            for i in 2..N - 2 {
                assert!(
                    (d[idx(i, j, N)] - d0[idx(i, j, N)]).abs() < 1e-12,
                    "still fluid must not move at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_project_reduces_divergence() {
        let mut u = vec![0.0; N * N];
        let mut v = vec![0.0; N * N];
        let mut p = vec![0.0; N * N];
        let mut div = vec![0.0; N * N];

        // Localized radial source flow; the envelope decays to ~0 at the
        // walls so the divergence is actually removable in a closed box.
        let c = (N / 2) as f64;
        for j in 1..N - 1 {
            for i in 1..N - 1 {
                let dx = i as f64 - c;
                let dy = j as f64 - c;
                let g = (-(dx * dx + dy * dy) / 8.0).exp();
                u[idx(i, j, N)] = dx * 0.01 * g;
                v[idx(i, j, N)] = dy * 0.01 * g;
            }
        }

        let div_of = |u: &[f64], v: &[f64]| {
            let mut total = 0.0;
            for j in 2..N - 2 {
                for i in 2..N - 2 {
                    total += (u[idx(i + 1, j, N)] - u[idx(i - 1, j, N)] + v[idx(i, j + 1, N)]
                        - v[idx(i, j - 1, N)])
                        .abs();
                }
            }
            total
        };

        let before = div_of(&u, &v);
        let gs = GaussSeidel::new(N);
        project(&mut u, &mut v, &mut p, &mut div, 120, &gs, N);
        let after = div_of(&u, &v);

        assert!(before > 0.0);
        assert!(
            after < before * 0.1,
            "projection should kill most divergence: {} -> {}",
            before,
            after
        );
    }

    #[test]
    fn test_buoyancy_uniform_density_gives_pure_lift() {
        let d = vec![2.0; N * N];
        let mut f = vec![0.0; N * N];
        buoyancy(&mut f, &d, 0.000625, 0.025, N);
        // d == Tamb everywhere, so only the a*d term remains.
        for j in 1..N - 1 {
            for i in 1..N - 1 {
                assert!((f[idx(i, j, N)] - 0.000625 * 2.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_density_moves_downstream() {
        let mut s = solver();
        let mid = N / 2;
        for _ in 0..10 {
            s.add_density(mid, mid, 50.0);
            s.add_velocity(mid, mid, 40.0, 0.0);
            s.update(0.1);
        }
        let downstream = s.density()[idx(mid + 1, mid, N)];
        let upstream = s.density()[idx(mid - 1, mid, N)];
        assert!(
            downstream > upstream,
            "density should drift with the flow: downstream {} vs upstream {}",
            downstream,
            upstream
        );
    }

    #[test]
    fn test_sources_cleared_after_update() {
        let mut s = solver();
        s.add_density(3, 3, 10.0);
        s.add_velocity(3, 3, 1.0, -1.0);
        s.update(0.05);
        assert!(s.d.old.iter().all(|&v| v == 0.0), "density sources must be consumed");
        assert!(s.u.old.iter().all(|&v| v == 0.0), "velocity sources must be consumed");
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut s = solver();
        s.add_density(4, 4, 5.0);
        s.add_velocity(4, 4, 1.0, 1.0);
        s.update(0.1);
        s.reset();
        assert!(s.density().iter().all(|&v| v == 0.0));
        assert!(s.velocity_u().iter().all(|&v| v == 0.0));
        assert!(s.velocity_v().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_confinement_step_runs() {
        let mut params = StableParams::default();
        params.vorticity_confinement = true;
        let mut s = StableFluids2D::with_params(N, params, Box::new(GaussSeidel::new(N)));
        s.add_density(N / 2, N / 2, 20.0);
        s.add_velocity(N / 2, N / 2, 5.0, 5.0);
        for _ in 0..5 {
            s.update(0.1);
        }
        assert!(s.density().iter().all(|v| v.is_finite()));
        assert!(s.velocity_u().iter().all(|v| v.is_finite()));
    }
}
