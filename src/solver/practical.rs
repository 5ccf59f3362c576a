//! Compressible "practical" solver in the Mick West style: explicit
//! diffusion, gradient-push forces from pressure and heat, and
//! mass-conserving forward/reverse advection instead of a projection step.
//!
//! Each step runs three phases: diffusion, forces, advection. Every phase
//! is gated on its rate parameter, so a zeroed knob costs nothing.

use crate::grid::{idx, FieldPair};
use crate::solver::linear::LinearSolver2D;
use crate::solver::params::PracticalParams;
use crate::solver::EulerianSolver2D;

/// Velocities closer to zero than this are treated as still fluid and
/// skipped during advection.
const ZERO_EPS: f64 = 1e-5;

pub struct PracticalFluids2D {
    n: usize,
    pub params: PracticalParams,
    pub u: FieldPair,
    pub v: FieldPair,
    pub pressure: FieldPair,
    pub heat: FieldPair,
    pub d: FieldPair,
    curl: Vec<f64>,
    solver: Box<dyn LinearSolver2D>,
}

impl PracticalFluids2D {
    pub fn new(n: usize, solver: Box<dyn LinearSolver2D>) -> Self {
        Self::with_params(n, PracticalParams::default(), solver)
    }

    pub fn with_params(n: usize, params: PracticalParams, solver: Box<dyn LinearSolver2D>) -> Self {
        debug_assert_eq!(solver.resolution(), n);
        log::debug!(
            "practical solver: n={}, pressure_acc={}, vorticity={}",
            n,
            params.pressure_acceleration,
            params.vorticity
        );
        let size = n * n;
        let mut s = Self {
            n,
            params,
            u: FieldPair::new(size),
            v: FieldPair::new(size),
            pressure: FieldPair::new(size),
            heat: FieldPair::new(size),
            d: FieldPair::new(size),
            curl: vec![0.0; size],
            solver,
        };
        s.reset();
        s
    }

    /// Splat velocity at a floating point position.
    pub fn add_velocity(&mut self, x: f64, y: f64, du: f64, dv: f64) {
        distribute(&mut self.u.cur, x, y, du, self.n);
        distribute(&mut self.v.cur, x, y, dv, self.n);
    }

    /// Splat density at a floating point position.
    pub fn add_density(&mut self, x: f64, y: f64, amount: f64) {
        distribute(&mut self.d.cur, x, y, amount, self.n);
    }

    /// Splat heat at a floating point position.
    pub fn add_heat(&mut self, x: f64, y: f64, amount: f64) {
        distribute(&mut self.heat.cur, x, y, amount, self.n);
    }

    fn update_diffusion(&mut self, dt: f64) {
        let iters = self.params.diffusion_iterations;
        let solver = self.solver.as_ref();

        if self.params.velocity_diffusion != 0.0 {
            let rate = self.params.velocity_diffusion / iters as f64;
            for _ in 0..iters {
                diffuse_once(&mut self.u.old, &self.u.cur, rate, dt, solver, self.n);
                self.u.swap();
                diffuse_once(&mut self.v.old, &self.v.cur, rate, dt, solver, self.n);
                self.v.swap();
            }
        }

        if self.params.pressure_diffusion != 0.0 {
            let rate = self.params.pressure_diffusion / iters as f64;
            for _ in 0..iters {
                diffuse_once(&mut self.pressure.old, &self.pressure.cur, rate, dt, solver, self.n);
                self.pressure.swap();
            }
        }

        if self.params.heat_diffusion != 0.0 {
            let rate = self.params.heat_diffusion / iters as f64;
            for _ in 0..iters {
                diffuse_once(&mut self.heat.old, &self.heat.cur, rate, dt, solver, self.n);
                self.heat.swap();
            }
        }

        if self.params.density_diffusion != 0.0 {
            let rate = self.params.density_diffusion / iters as f64;
            for _ in 0..iters {
                diffuse_once(&mut self.d.old, &self.d.cur, rate, dt, solver, self.n);
                self.d.swap();
            }
        }
    }

    fn update_forces(&mut self, dt: f64) {
        // Upward force on velocity from density rising under its own steam.
        if self.params.density_force != 0.0 {
            force_from(&mut self.v.cur, &self.d.cur, self.params.density_force);
        }

        // Velocity pushed away from hot cells (or toward them when the
        // force is negative).
        if self.params.heat_force != 0.0 {
            gradient_push(
                &self.heat.cur,
                &mut self.u.cur,
                &mut self.v.cur,
                self.params.heat_force,
                dt,
                self.n,
            );

            if self.params.heat_decay != 0.0 {
                exponential_decay(&mut self.heat.cur, self.params.heat_decay, dt);
            }
        }

        // Dampening from viscosity.
        if self.params.velocity_decay != 0.0 {
            exponential_decay(&mut self.u.cur, self.params.velocity_decay, dt);
            exponential_decay(&mut self.v.cur, self.params.velocity_decay, dt);
        }

        // Equilibrium force on pressure for mass conservation.
        if self.params.pressure_acceleration != 0.0 {
            gradient_push(
                &self.pressure.cur,
                &mut self.u.cur,
                &mut self.v.cur,
                self.params.pressure_acceleration,
                dt,
                self.n,
            );
        }

        // Curl force to counter artificial dampening of vortices.
        if self.params.vorticity != 0.0 {
            self.confine_vorticity(self.params.vorticity);
        }
    }

    fn update_advection(&mut self, dt: f64) {
        let n = self.n;
        // Normalize advection by grid size: smaller grids mean larger
        // cells, so the scale shrinks with the side length. On a square
        // grid this comes out to 1.
        let avg_dimension = (n + n) as f64 / 2.0;
        let advection_scale = avg_dimension / n as f64;

        // Density is one fluid suspended in another, like smoke in air.
        let d_force = self.params.density_advection * advection_scale;
        forward_advection(&mut self.d.old, &self.d.cur, &self.u.cur, &self.v.cur, d_force, dt, n);
        self.d.swap();
        reverse_advection(&mut self.d.old, &self.d.cur, &self.u.cur, &self.v.cur, d_force, dt, n);
        self.d.swap();

        // Heat is only advected while it applies a force.
        if self.params.heat_force != 0.0 {
            let h_force = self.params.heat_advection * advection_scale;
            forward_advection(
                &mut self.heat.old,
                &self.heat.cur,
                &self.u.cur,
                &self.v.cur,
                h_force,
                dt,
                n,
            );
            self.heat.swap();
            reverse_advection(
                &mut self.heat.old,
                &self.heat.cur,
                &self.u.cur,
                &self.v.cur,
                h_force,
                dt,
                n,
            );
            self.heat.swap();
        }

        // Advection order matters: advecting pressure first leads to
        // self-maintaining waves and ripple artifacts, advecting velocity
        // first naturally dissipates them.
        let v_force = self.params.velocity_advection * advection_scale;
        forward_advection(&mut self.u.old, &self.u.cur, &self.u.cur, &self.v.cur, v_force, dt, n);
        forward_advection(&mut self.v.old, &self.v.cur, &self.u.cur, &self.v.cur, v_force, dt, n);
        // Velocity components are signed, so the cheaper signed variant works.
        self.reverse_signed_advection(v_force, dt);

        self.invert_velocity_edges();

        // Pressure represents a compressible fluid, like the air itself.
        let p_force = self.params.pressure_advection * advection_scale;
        forward_advection(
            &mut self.pressure.old,
            &self.pressure.cur,
            &self.u.cur,
            &self.v.cur,
            p_force,
            dt,
            n,
        );
        self.pressure.swap();
        reverse_advection(
            &mut self.pressure.old,
            &self.pressure.cur,
            &self.u.cur,
            &self.v.cur,
            p_force,
            dt,
            n,
        );
        self.pressure.swap();
    }

    /// Signed reverse advection for the velocity field itself. Mass
    /// conserving and cheaper than the fair-split variant, but only valid
    /// for quantities allowed to go negative.
    ///
    /// Backtraces through the pre-advection velocities (`cur`), pulls
    /// amounts from the forward-advected fields (`old`), and leaves the
    /// final velocities in `cur`.
    fn reverse_signed_advection(&mut self, scale: f64, dt: f64) {
        let n = self.n;
        let force = -dt * scale;

        let mut out_x = self.u.old.clone();
        let mut out_y = self.v.old.clone();

        for x in 0..n {
            for y in 0..n {
                let vx = self.u.cur[idx(x, y, n)];
                let vy = self.v.cur[idx(x, y, n)];
                if near_zero(vx) && near_zero(vy) {
                    continue;
                }

                let (x1, y1) = collide(x as f64 + vx * force, y as f64 + vy * force, n);
                let x1a = x1 as usize;
                let y1a = y1 as usize;
                let fx1 = x1 - x1a as f64;
                let fy1 = y1 - y1a as f64;

                let ka = idx(x1a, y1a, n);
                let kb = idx(x1a + 1, y1a, n);
                let kc = idx(x1a, y1a + 1, n);
                let kd = idx(x1a + 1, y1a + 1, n);

                let a_x = (1.0 - fy1) * (1.0 - fx1) * self.u.old[ka];
                let b_x = (1.0 - fy1) * fx1 * self.u.old[kb];
                let c_x = fy1 * (1.0 - fx1) * self.u.old[kc];
                let d_x = fy1 * fx1 * self.u.old[kd];

                let a_y = (1.0 - fy1) * (1.0 - fx1) * self.v.old[ka];
                let b_y = (1.0 - fy1) * fx1 * self.v.old[kb];
                let c_y = fy1 * (1.0 - fx1) * self.v.old[kc];
                let d_y = fy1 * fx1 * self.v.old[kd];

                let k = idx(x, y, n);
                out_x[k] += a_x + b_x + c_x + d_x;
                out_x[ka] -= a_x;
                out_x[kb] -= b_x;
                out_x[kc] -= c_x;
                out_x[kd] -= d_x;

                out_y[k] += a_y + b_y + c_y + d_y;
                out_y[ka] -= a_y;
                out_y[kb] -= b_y;
                out_y[kc] -= c_y;
                out_y[kd] -= d_y;
            }
        }

        self.u.cur.copy_from_slice(&out_x);
        self.v.cur.copy_from_slice(&out_y);
    }

    /// Flip velocities that point out of the domain at its edges.
    fn invert_velocity_edges(&mut self) {
        let n = self.n;
        for y in 0..n {
            if self.u.cur[idx(0, y, n)] < 0.0 {
                self.u.cur[idx(0, y, n)] = -self.u.cur[idx(0, y, n)];
            }
            if self.u.cur[idx(n - 1, y, n)] > 0.0 {
                self.u.cur[idx(n - 1, y, n)] = -self.u.cur[idx(n - 1, y, n)];
            }
        }
        for x in 0..n {
            if self.v.cur[idx(x, 0, n)] < 0.0 {
                self.v.cur[idx(x, 0, n)] = -self.v.cur[idx(x, 0, n)];
            }
            if self.v.cur[idx(x, n - 1, n)] > 0.0 {
                self.v.cur[idx(x, n - 1, n)] = -self.v.cur[idx(x, n - 1, n)];
            }
        }
    }

    /// Vorticity confinement: measure curl magnitude, build a force field
    /// perpendicular to its gradient in the scratch buffers, then feed it
    /// back into the velocities.
    fn confine_vorticity(&mut self, scale: f64) {
        let n = self.n;

        self.u.clear_old();
        self.v.clear_old();
        self.curl.fill(0.0);

        for i in 1..n - 1 {
            for j in 1..n - 1 {
                self.curl[idx(i, j, n)] = curl_at(&self.u.cur, &self.v.cur, i, j, n).abs();
            }
        }

        for x in 2..n - 1 {
            for y in 2..n - 1 {
                let mut lr_curl = (self.curl[idx(x + 1, y, n)] - self.curl[idx(x - 1, y, n)]) * 0.5;
                let mut ud_curl = (self.curl[idx(x, y + 1, n)] - self.curl[idx(x, y - 1, n)]) * 0.5;

                let length = (lr_curl * lr_curl + ud_curl * ud_curl).sqrt() + 0.000001;
                lr_curl /= length;
                ud_curl /= length;

                let magnitude = curl_at(&self.u.cur, &self.v.cur, x, y, n);

                self.u.old[idx(x, y, n)] = -ud_curl * magnitude;
                self.v.old[idx(x, y, n)] = lr_curl * magnitude;
            }
        }

        force_from(&mut self.u.cur, &self.u.old, scale);
        force_from(&mut self.v.cur, &self.v.old, scale);
    }
}

impl EulerianSolver2D for PracticalFluids2D {
    fn resolution(&self) -> usize {
        self.n
    }

    fn reset(&mut self) {
        self.u.clear();
        self.v.clear();
        self.d.clear();
        self.pressure.clear();
        self.heat.clear();
        self.curl.fill(0.0);
        self.pressure.fill_cur(self.params.initial_pressure);
        self.heat.fill_cur(self.params.initial_heat);
    }

    fn update(&mut self, dt: f64) {
        self.update_diffusion(dt);
        self.update_forces(dt);
        self.update_advection(dt);
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

fn near_zero(v: f64) -> bool {
    v.abs() < ZERO_EPS
}

/// One explicit diffusion step. Border cells exchange with only their
/// in-grid neighbors (three on an edge, two in a corner) so no mass leaks
/// through the walls; the interior is the solver's relaxation pass over
/// the plain four-neighbor stencil.
fn diffuse_once(
    p_out: &mut [f64],
    p_in: &[f64],
    scale: f64,
    dt: f64,
    solver: &dyn LinearSolver2D,
    n: usize,
) {
    let force = dt * scale;

    // top and bottom edges
    for x in 1..n - 1 {
        p_out[idx(x, 0, n)] = p_in[idx(x, 0, n)]
            + force
                * (p_in[idx(x - 1, 0, n)] + p_in[idx(x + 1, 0, n)] + p_in[idx(x, 1, n)]
                    - 3.0 * p_in[idx(x, 0, n)]);
        p_out[idx(x, n - 1, n)] = p_in[idx(x, n - 1, n)]
            + force
                * (p_in[idx(x - 1, n - 1, n)] + p_in[idx(x + 1, n - 1, n)]
                    + p_in[idx(x, n - 2, n)]
                    - 3.0 * p_in[idx(x, n - 1, n)]);
    }

    // left and right edges
    for y in 1..n - 1 {
        p_out[idx(0, y, n)] = p_in[idx(0, y, n)]
            + force
                * (p_in[idx(0, y - 1, n)] + p_in[idx(0, y + 1, n)] + p_in[idx(1, y, n)]
                    - 3.0 * p_in[idx(0, y, n)]);
        p_out[idx(n - 1, y, n)] = p_in[idx(n - 1, y, n)]
            + force
                * (p_in[idx(n - 1, y - 1, n)] + p_in[idx(n - 1, y + 1, n)]
                    + p_in[idx(n - 2, y, n)]
                    - 3.0 * p_in[idx(n - 1, y, n)]);
    }

    // corners
    p_out[idx(0, 0, n)] = p_in[idx(0, 0, n)]
        + force * (p_in[idx(1, 0, n)] + p_in[idx(0, 1, n)] - 2.0 * p_in[idx(0, 0, n)]);
    p_out[idx(n - 1, 0, n)] = p_in[idx(n - 1, 0, n)]
        + force * (p_in[idx(n - 2, 0, n)] + p_in[idx(n - 1, 1, n)] - 2.0 * p_in[idx(n - 1, 0, n)]);
    p_out[idx(0, n - 1, n)] = p_in[idx(0, n - 1, n)]
        + force * (p_in[idx(1, n - 1, n)] + p_in[idx(0, n - 2, n)] - 2.0 * p_in[idx(0, n - 1, n)]);
    p_out[idx(n - 1, n - 1, n)] = p_in[idx(n - 1, n - 1, n)]
        + force
            * (p_in[idx(n - 2, n - 1, n)] + p_in[idx(n - 1, n - 2, n)]
                - 2.0 * p_in[idx(n - 1, n - 1, n)]);

    // everything else
    solver.relax(p_out, p_in, force, 4.0);
}

/// p_out += p_in * f, cell by cell.
fn force_from(p_out: &mut [f64], p_in: &[f64], f: f64) {
    for (out, inp) in p_out.iter_mut().zip(p_in) {
        *out += inp * f;
    }
}

/// Accelerate velocity along the negative gradient of `src`: each pair of
/// adjacent cells gets pushed apart (or together, for a negative scale) in
/// proportion to their differential. High pressure turns the velocity
/// field away from itself.
fn gradient_push(src: &[f64], u: &mut [f64], v: &mut [f64], scale: f64, dt: f64, n: usize) {
    let force = dt * scale;

    for x in 0..n - 1 {
        for y in 0..n - 1 {
            let force_x = src[idx(x, y, n)] - src[idx(x + 1, y, n)];
            let force_y = src[idx(x, y, n)] - src[idx(x, y + 1, n)];

            u[idx(x, y, n)] += force * force_x;
            u[idx(x + 1, y, n)] += force * force_x;

            v[idx(x, y, n)] += force * force_y;
            v[idx(x, y + 1, n)] += force * force_y;
        }
    }
}

/// field *= (1 - decay)^dt.
fn exponential_decay(field: &mut [f64], decay: f64, dt: f64) {
    let factor = (1.0 - decay).powf(dt);
    for v in field.iter_mut() {
        *v *= factor;
    }
}

/// Curl at (x, y): difference of u across rows minus difference of v across
/// columns, positive for counter-clockwise rotation.
fn curl_at(u: &[f64], v: &[f64], x: usize, y: usize, n: usize) -> f64 {
    let x_curl = (u[idx(x, y + 1, n)] - u[idx(x, y - 1, n)]) * 0.5;
    let y_curl = (v[idx(x + 1, y, n)] - v[idx(x - 1, y, n)]) * 0.5;
    x_curl - y_curl
}

/// Mirror an advection target back into the grid. The usable domain stops
/// just short of the last row/column so the bilinear corner x1a+1 stays in
/// bounds.
fn collide(mut x1: f64, mut y1: f64, n: usize) -> (f64, f64) {
    let bound = n as f64 - 1.0001;

    while x1 < 0.0 || x1 > bound {
        if x1 < 0.0 {
            x1 = -x1;
        } else {
            x1 = 2.0 * bound - x1;
        }
    }
    while y1 < 0.0 || y1 > bound {
        if y1 < 0.0 {
            y1 = -y1;
        } else {
            y1 = 2.0 * bound - y1;
        }
    }

    (x1, y1)
}

/// Forward advection: move the value at each point forward along its own
/// velocity and distribute it over the four surrounding grid points,
/// subtracting what was given from the source. Adding/subtracting rather
/// than moving keeps the total conserved.
fn forward_advection(
    p_out: &mut [f64],
    p_in: &[f64],
    vu: &[f64],
    vv: &[f64],
    scale: f64,
    dt: f64,
    n: usize,
) {
    let force = dt * scale;

    p_out.copy_from_slice(p_in);

    if force == 0.0 {
        return;
    }

    for x in 0..n {
        for y in 0..n {
            let vx = vu[idx(x, y, n)];
            let vy = vv[idx(x, y, n)];
            if near_zero(vx) && near_zero(vy) {
                continue;
            }

            let (x1, y1) = collide(x as f64 + vx * force, y as f64 + vy * force, n);
            let x1a = x1 as usize;
            let y1a = y1 as usize;
            let fx1 = x1 - x1a as f64;
            let fy1 = y1 - y1a as f64;

            // Landing point falls inside a cell; split the source value
            // over its four corners by bilinear weights.
            let source_value = p_in[idx(x, y, n)];
            let a = (1.0 - fy1) * (1.0 - fx1) * source_value;
            let b = (1.0 - fy1) * fx1 * source_value;
            let c = fy1 * (1.0 - fx1) * source_value;
            let d = fy1 * fx1 * source_value;

            p_out[idx(x1a, y1a, n)] += a;
            p_out[idx(x1a + 1, y1a, n)] += b;
            p_out[idx(x1a, y1a + 1, n)] += c;
            p_out[idx(x1a + 1, y1a + 1, n)] += d;

            p_out[idx(x, y, n)] -= a + b + c + d;
        }
    }
}

/// Reverse advection: backtrace each destination through the velocity
/// field and pull value in from the four cells around the landing point.
///
/// Naively subtracting what each destination takes would let the first
/// destination processed drain a contested source dry and starve the rest,
/// with holes forming by update order. Instead a first pass records every
/// request, and a second pass scales them: if the total demand on a source
/// is at or below 1 everyone gets what they asked for, above 1 the requests
/// are split proportionally.
fn reverse_advection(
    p_out: &mut [f64],
    p_in: &[f64],
    vu: &[f64],
    vv: &[f64],
    scale: f64,
    dt: f64,
    n: usize,
) {
    let size = n * n;
    let force = -dt * scale;

    p_out.copy_from_slice(p_in);

    // Per-source bookkeeping: destination corner A plus the four bilinear
    // fractions, and the total demand accumulated on every destination.
    let mut from_source: Vec<Option<(usize, usize)>> = vec![None; size];
    let mut frac_a = vec![0.0; size];
    let mut frac_b = vec![0.0; size];
    let mut frac_c = vec![0.0; size];
    let mut frac_d = vec![0.0; size];
    let mut total_dest = vec![0.0; size];

    for y in 0..n {
        for x in 0..n {
            let vx = vu[idx(x, y, n)];
            let vy = vv[idx(x, y, n)];
            if near_zero(vx) && near_zero(vy) {
                continue;
            }

            let (x1, y1) = collide(x as f64 + vx * force, y as f64 + vy * force, n);
            let x1a = x1 as usize;
            let y1a = y1 as usize;
            let fx1 = x1 - x1a as f64;
            let fy1 = y1 - y1a as f64;

            let a = (1.0 - fy1) * (1.0 - fx1);
            let b = (1.0 - fy1) * fx1;
            let c = fy1 * (1.0 - fx1);
            let d = fy1 * fx1;

            let k = idx(x, y, n);
            from_source[k] = Some((x1a, y1a));
            frac_a[k] = a;
            frac_b[k] = b;
            frac_c[k] = c;
            frac_d[k] = d;

            total_dest[idx(x1a, y1a, n)] += a;
            total_dest[idx(x1a + 1, y1a, n)] += b;
            total_dest[idx(x1a, y1a + 1, n)] += c;
            total_dest[idx(x1a + 1, y1a + 1, n)] += d;
        }
    }

    for y in 0..n {
        for x in 0..n {
            let k = idx(x, y, n);
            let Some((x1a, y1a)) = from_source[k] else {
                continue;
            };

            let ka = idx(x1a, y1a, n);
            let kb = idx(x1a + 1, y1a, n);
            let kc = idx(x1a, y1a + 1, n);
            let kd = idx(x1a + 1, y1a + 1, n);

            let a = frac_a[k] / total_dest[ka].max(1.0);
            let b = frac_b[k] / total_dest[kb].max(1.0);
            let c = frac_c[k] / total_dest[kc].max(1.0);
            let d = frac_d[k] / total_dest[kd].max(1.0);

            // Fractions come out of the unmodified input, so later cells
            // see the same source values.
            p_out[k] += a * p_in[ka] + b * p_in[kb] + c * p_in[kc] + d * p_in[kd];

            p_out[ka] -= a * p_in[ka];
            p_out[kb] -= b * p_in[kb];
            p_out[kc] -= c * p_in[kc];
            p_out[kd] -= d * p_in[kd];
        }
    }
}

/// Bilinear splat of `value` onto the four grid points around (x, y).
pub fn distribute(p: &mut [f64], x: f64, y: f64, value: f64, n: usize) {
    let ix = x.floor() as usize;
    let iy = y.floor() as usize;
    let fx = x - ix as f64;
    let fy = y - iy as f64;

    p[idx(ix, iy, n)] += (1.0 - fy) * (1.0 - fx) * value;
    p[idx(ix + 1, iy, n)] += (1.0 - fy) * fx * value;
    p[idx(ix, iy + 1, n)] += fy * (1.0 - fx) * value;
    p[idx(ix + 1, iy + 1, n)] += fy * fx * value;
}
