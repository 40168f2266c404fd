/// Levenberg-Marquardt 1D Gaussian fitting (4-param) for row/column cuts.
/// All internal computations in f64 for numerical stability.

const MAX_ITER: usize = 50;
const CONV_TOL: f64 = 1e-8;
const NP: usize = 4;

/// FWHM of a Gaussian in units of sigma: 2·sqrt(2·ln 2).
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045;

/// 1D Gaussian model: f(x) = B + A * exp(-0.5 * (x - mu)^2 / sigma^2)
#[derive(Copy, Clone, Debug)]
pub struct GaussianFit1D {
    pub background: f64,
    pub amplitude: f64,
    pub mu: f64,
    pub sigma: f64,
    pub converged: bool,
}

impl GaussianFit1D {
    pub fn fwhm(&self) -> f64 {
        FWHM_PER_SIGMA * self.sigma.abs()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let d = (x - self.mu) / self.sigma;
        self.background + self.amplitude * (-0.5 * d * d).exp()
    }
}

/// Fit a Gaussian to `values` sampled at x = 0, 1, ..., N-1.
///
/// Initial guess: background = min, mean at the maximum, sigma from the
/// half-maximum width. Returns `None` for degenerate input or a fit that
/// ends with a non-positive amplitude or non-finite parameters.
pub(crate) fn fit_gaussian_1d(values: &[f64]) -> Option<GaussianFit1D> {
    if values.len() < NP + 1 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let (peak_idx, peak) = values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);
    let amp = peak - floor;
    if amp <= 0.0 {
        return None;
    }

    // Half-maximum width around the peak
    let half = floor + 0.5 * amp;
    let left = values[..peak_idx].iter().rposition(|&v| v < half).map_or(0, |i| i + 1);
    let right = values[peak_idx..]
        .iter()
        .position(|&v| v < half)
        .map_or(values.len() - 1, |i| peak_idx + i - 1);
    let init_sigma = ((right - left + 1) as f64 / FWHM_PER_SIGMA).max(0.5);

    let mut params = [floor, amp, peak_idx as f64, init_sigma];
    let converged = lm_solve_1d(values, &mut params);

    let [background, amplitude, mu, sigma] = params;
    if !params.iter().all(|p| p.is_finite()) || amplitude <= 0.0 || sigma.abs() < 1e-3 {
        return None;
    }

    Some(GaussianFit1D {
        background,
        amplitude,
        mu,
        sigma: sigma.abs(),
        converged,
    })
}

fn lm_solve_1d(values: &[f64], params: &mut [f64; NP]) -> bool {
    let mut lambda = 1e-3_f64;
    let mut nu = 2.0_f64;
    let mut best_cost = residual_cost_1d(values, params);
    let mut converged = false;

    let mut jtj = [0.0_f64; NP * NP];
    let mut jtr = [0.0_f64; NP];
    let mut j = [0.0_f64; NP];
    let mut mat = [0.0_f64; NP * NP];

    for _ in 0..MAX_ITER {
        jtj.fill(0.0);
        jtr.fill(0.0);

        let (a, mu, sigma) = (params[1], params[2], params[3]);
        let inv_s2 = 1.0 / (sigma * sigma);

        for (i, &value) in values.iter().enumerate() {
            let dx = i as f64 - mu;
            let e = (-0.5 * dx * dx * inv_s2).exp();
            let r = value - (params[0] + a * e);

            j[0] = 1.0; // dF/dB
            j[1] = e; // dF/dA
            j[2] = a * e * dx * inv_s2; // dF/dmu
            j[3] = a * e * dx * dx * inv_s2 / sigma; // dF/dsigma

            for p in 0..NP {
                jtr[p] += j[p] * r;
                for q in p..NP {
                    jtj[p * NP + q] += j[p] * j[q];
                }
            }
        }

        for p in 0..NP {
            for q in 0..p {
                jtj[p * NP + q] = jtj[q * NP + p];
            }
        }

        // Damped normal equations
        mat.copy_from_slice(&jtj);
        for p in 0..NP {
            mat[p * NP + p] += lambda * jtj[p * NP + p].max(1e-12);
        }

        let delta = match cholesky_solve(&mat, &jtr, NP) {
            Some(d) => d,
            None => break,
        };

        let mut new_params = *params;
        for p in 0..NP {
            new_params[p] += delta[p];
        }
        if new_params[3] <= 0.0 {
            new_params[3] = params[3] * 0.5;
        }

        let new_cost = residual_cost_1d(values, &new_params);

        // Nielsen gain ratio
        let predicted: f64 = delta
            .iter()
            .enumerate()
            .map(|(i, d)| d * (lambda * jtj[i * NP + i].max(1e-12) * d + jtr[i]))
            .sum();

        if predicted > 0.0 && best_cost - new_cost > 0.0 {
            let rho = (best_cost - new_cost) / predicted;
            *params = new_params;
            best_cost = new_cost;
            lambda *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;
        } else {
            lambda *= nu;
            nu *= 2.0;
        }

        let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
        let delta_norm = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
        if delta_norm / param_norm.max(1e-12) < CONV_TOL || best_cost < 1e-18 {
            converged = true;
            break;
        }
    }

    converged
}

fn residual_cost_1d(values: &[f64], params: &[f64; NP]) -> f64 {
    let inv_s2 = 1.0 / (params[3] * params[3]);
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let dx = i as f64 - params[2];
            let r = v - (params[0] + params[1] * (-0.5 * dx * dx * inv_s2).exp());
            r * r
        })
        .sum()
}

/// Cholesky decomposition solver for symmetric positive-definite system.
/// Matrix stored as flat array, row-major, size np×np.
fn cholesky_solve(mat: &[f64], rhs: &[f64], np: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0_f64; np * np];

    for i in 0..np {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i * np + k] * l[j * np + k]).sum();
            if i == j {
                let diag = mat[i * np + i] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[i * np + j] = diag.sqrt();
            } else {
                l[i * np + j] = (mat[i * np + j] - sum) / l[j * np + j];
            }
        }
    }

    // L * y = rhs
    let mut y = vec![0.0_f64; np];
    for i in 0..np {
        let sum: f64 = (0..i).map(|j| l[i * np + j] * y[j]).sum();
        y[i] = (rhs[i] - sum) / l[i * np + i];
    }

    // L^T * x = y
    let mut x = vec![0.0_f64; np];
    for i in (0..np).rev() {
        let sum: f64 = ((i + 1)..np).map(|j| l[j * np + i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i * np + i];
    }

    Some(x)
}
