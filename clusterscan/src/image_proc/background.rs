//! Background level and noise dispersion from the luminosity histogram.
//!
//! Sky images are dominated by background pixels whose values scatter around
//! a common level. Histogramming every pixel and fitting a single Gaussian
//! to the distribution gives that level (the mean) and the noise dispersion
//! (the standard deviation), from which the detection threshold follows:
//!
//! ```text
//! threshold = background + k * dispersion      (k = 6 by default)
//! ```
//!
//! The fit uses Levenberg-Marquardt on the model
//! `f(x) = a * exp(-(x - μ)² / (2σ²))`. Counts are normalized by the peak
//! bin and positions by the histogram span so the three parameters stay
//! well conditioned regardless of the image's units.

use log::debug;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::grid::PixelGrid;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE_TOLERANCE: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e12;

/// Errors from histogramming or fitting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackgroundError {
    #[error("Histogram needs at least one bin")]
    EmptyHistogram,
    #[error("Image is flat at value {0}; no background distribution to fit")]
    FlatImage(f64),
    #[error("Gaussian fit diverged after {iterations} iterations")]
    FitDiverged { iterations: usize },
}

/// Gaussian profile `amplitude * exp(-(x - mean)² / (2 dispersion²))`.
pub fn gaussian(x: f64, amplitude: f64, mean: f64, dispersion: f64) -> f64 {
    let z = (x - mean) / dispersion;
    amplitude * (-0.5 * z * z).exp()
}

/// Equal-width histogram of grid values.
///
/// Bins span `[min, max]` of the data; the last bin includes `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn from_grid(grid: &PixelGrid, bins: usize) -> Result<Self, BackgroundError> {
        if bins == 0 {
            return Err(BackgroundError::EmptyHistogram);
        }
        let (min, max) = grid.min_max();
        if max <= min {
            return Err(BackgroundError::FlatImage(min));
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0u64; bins];
        for &value in grid.view().iter() {
            let bin = (((value - min) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Ok(Self { min, max, counts })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins() as f64
    }

    /// Center value of each bin.
    pub fn centers(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..self.bins())
            .map(|i| self.min + (i as f64 + 0.5) * width)
            .collect()
    }

    /// Index of the most populated bin (first one on ties).
    pub fn peak_bin(&self) -> usize {
        let mut peak = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count > self.counts[peak] {
                peak = i;
            }
        }
        peak
    }
}

/// Fitted background distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundModel {
    /// Peak height of the fitted Gaussian, in pixel counts per bin
    pub amplitude: f64,
    /// Mean background luminosity
    pub background: f64,
    /// Standard deviation of the background (always non-negative)
    pub dispersion: f64,
}

impl BackgroundModel {
    /// Detection threshold `background + multiplier * dispersion`.
    pub fn threshold(&self, multiplier: f64) -> f64 {
        self.background + multiplier * self.dispersion
    }

    /// Evaluate the fitted profile at luminosity `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        gaussian(x, self.amplitude, self.background, self.dispersion)
    }
}

/// Fit the background model to a `bins`-bin histogram of `grid`.
pub fn fit_background(grid: &PixelGrid, bins: usize) -> Result<BackgroundModel, BackgroundError> {
    let histogram = Histogram::from_grid(grid, bins)?;
    fit_histogram(&histogram)
}

/// Fit a Gaussian to an existing histogram.
pub fn fit_histogram(histogram: &Histogram) -> Result<BackgroundModel, BackgroundError> {
    let span = histogram.max - histogram.min;
    let peak = histogram.peak_bin();
    let peak_count = histogram.counts[peak] as f64;

    // Normalized coordinates: x in [0, 1] across the span, y in [0, 1]
    let xs: Vec<f64> = histogram
        .centers()
        .iter()
        .map(|c| (c - histogram.min) / span)
        .collect();
    let ys: Vec<f64> = histogram
        .counts
        .iter()
        .map(|&c| c as f64 / peak_count)
        .collect();

    let initial = Vector3::new(1.0, xs[peak], initial_sigma(histogram, peak) / span);
    let (params, iterations) = levenberg_marquardt(&xs, &ys, initial)?;

    let model = BackgroundModel {
        amplitude: params[0] * peak_count,
        background: histogram.min + params[1] * span,
        dispersion: (params[2] * span).abs(),
    };
    debug!(
        "Background fit converged in {iterations} iterations: background={:.3}, dispersion={:.3}",
        model.background, model.dispersion
    );
    Ok(model)
}

/// Starting sigma from the width of the bins above half the peak count.
fn initial_sigma(histogram: &Histogram, peak: usize) -> f64 {
    let half = histogram.counts[peak] / 2;
    let mut lo = peak;
    while lo > 0 && histogram.counts[lo - 1] >= half {
        lo -= 1;
    }
    let mut hi = peak;
    while hi + 1 < histogram.bins() && histogram.counts[hi + 1] >= half {
        hi += 1;
    }

    let fwhm = (hi - lo + 1) as f64 * histogram.bin_width();
    (fwhm / 2.354_820_045).max(histogram.bin_width() / 2.0)
}

fn sum_squared_residuals(xs: &[f64], ys: &[f64], p: &Vector3<f64>) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - gaussian(x, p[0], p[1], p[2]);
            r * r
        })
        .sum()
}

fn levenberg_marquardt(
    xs: &[f64],
    ys: &[f64],
    initial: Vector3<f64>,
) -> Result<(Vector3<f64>, usize), BackgroundError> {
    let mut params = initial;
    let mut cost = sum_squared_residuals(xs, ys, &params);
    let mut damping = 1e-3;

    for iteration in 1..=MAX_ITERATIONS {
        let mut jtj = Matrix3::<f64>::zeros();
        let mut jtr = Vector3::<f64>::zeros();
        let (amplitude, mean, sigma) = (params[0], params[1], params[2]);

        for (&x, &y) in xs.iter().zip(ys) {
            let dx = x - mean;
            let e = (-0.5 * dx * dx / (sigma * sigma)).exp();
            let f = amplitude * e;
            let jacobian = Vector3::new(
                e,
                f * dx / (sigma * sigma),
                f * dx * dx / (sigma * sigma * sigma),
            );
            jtj += jacobian * jacobian.transpose();
            jtr += jacobian * (y - f);
        }

        // Retry with heavier damping until a step lowers the cost
        loop {
            let mut damped = jtj;
            for i in 0..3 {
                damped[(i, i)] += damping * jtj[(i, i)].max(f64::EPSILON);
            }

            let step = damped.lu().solve(&jtr);
            let candidate = step.map(|s| params + s);
            let candidate_cost = candidate.map(|c| sum_squared_residuals(xs, ys, &c));

            match (candidate, candidate_cost) {
                (Some(next), Some(next_cost)) if next_cost.is_finite() && next_cost <= cost => {
                    let improvement = cost - next_cost;
                    params = next;
                    cost = next_cost;
                    damping = (damping / 10.0).max(1e-12);
                    if improvement <= CONVERGENCE_TOLERANCE * cost.max(CONVERGENCE_TOLERANCE) {
                        return finish(params, iteration);
                    }
                    break;
                }
                _ => {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        // No step improves the fit: at a minimum
                        return finish(params, iteration);
                    }
                }
            }
        }
    }

    finish(params, MAX_ITERATIONS)
}

fn finish(params: Vector3<f64>, iterations: usize) -> Result<(Vector3<f64>, usize), BackgroundError> {
    if params.iter().all(|p| p.is_finite()) && params[2] != 0.0 {
        Ok((params, iterations))
    } else {
        Err(BackgroundError::FitDiverged { iterations })
    }
}
