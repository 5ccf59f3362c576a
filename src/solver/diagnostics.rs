use crate::grid::idx;

/// Sum a field over every cell. For conserved quantities (practical-solver
/// density, pressure, heat) this should stay constant between steps.
pub fn field_total(field: &[f64]) -> f64 {
    field.iter().sum()
}

/// Largest absolute central-difference divergence over the interior.
/// Near zero after a projection step.
pub fn max_divergence(u: &[f64], v: &[f64], n: usize) -> f64 {
    let mut max = 0.0_f64;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let div = (u[idx(i + 1, j, n)] - u[idx(i - 1, j, n)] + v[idx(i, j + 1, n)]
                - v[idx(i, j - 1, n)])
                * 0.5;
            max = max.max(div.abs());
        }
    }
    max
}

/// Volume-averaged kinetic energy over the interior: KE = 0.5 * <u² + v²>.
pub fn kinetic_energy(u: &[f64], v: &[f64], n: usize) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let k = idx(i, j, n);
            sum += u[k] * u[k] + v[k] * v[k];
            count += 1;
        }
    }
    if count > 0 {
        0.5 * sum / count as f64
    } else {
        0.0
    }
}
