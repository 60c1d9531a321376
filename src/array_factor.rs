//! Array factor of a rectangular planar array.
//!
//! For an `R x C` grid with excitation amplitudes `I`, element phases `d`
//! (radians), spacing `s`, and wave number `k = 2π/λ`:
//!
//! ```text
//! AF(θ, φ) = Σn Σm I[n][m] · exp(j·(d[n][m] + k·s·n·sin θ·cos φ + k·s·m·sin θ·sin φ))
//! ```
//!
//! Angles are radians. The result is complex; callers usually take `norm()`.

use std::f64::consts::TAU;

use num_complex::Complex64;

use crate::error::{BeamError, Result, check_angle, check_wavelength};
use crate::grid::ElementGrid;

/// Physical parameters of the array, fixed for a set of evaluations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayGeometry {
    rows: usize,
    cols: usize,
    spacing: f64,
    wavelength: f64,
}

impl ArrayGeometry {
    pub fn new(rows: usize, cols: usize, spacing: f64, wavelength: f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(BeamError::InvalidGrid {
                reason: format!("array factor needs at least one element, got {rows}x{cols}"),
            });
        }
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(BeamError::InvalidGrid {
                reason: format!("spacing must be positive and finite, got {spacing} m"),
            });
        }
        let wavelength = check_wavelength("ArrayGeometry::new", wavelength)?;
        Ok(Self { rows, cols, spacing, wavelength })
    }

    pub fn for_grid(grid: &ElementGrid, wavelength: f64) -> Result<Self> {
        Self::new(grid.rows(), grid.cols(), grid.spacing(), wavelength)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `k = 2π/λ`.
    pub fn wave_number(&self) -> f64 {
        TAU / self.wavelength
    }

    /// Path-length phase of element `(n, m)` toward `(theta, phi)`.
    pub fn geometric_phase(&self, n: usize, m: usize, theta: f64, phi: f64) -> f64 {
        let ks = self.wave_number() * self.spacing;
        let st = theta.sin();
        ks * n as f64 * st * phi.cos() + ks * m as f64 * st * phi.sin()
    }

    /// [`geometric_phase`](Self::geometric_phase) for every element, row-major.
    pub fn geometric_phases(&self, theta: f64, phi: f64) -> Vec<f64> {
        (0..self.rows)
            .flat_map(|n| (0..self.cols).map(move |m| (n, m)))
            .map(|(n, m)| self.geometric_phase(n, m, theta, phi))
            .collect()
    }

    /// Evaluate the array factor for per-element amplitudes and phases.
    pub fn evaluate(
        &self,
        amplitudes: &[Vec<f64>],
        phases: &[Vec<f64>],
        theta: f64,
        phi: f64,
    ) -> Result<Complex64> {
        self.check_shape("array_factor amplitudes", amplitudes)?;
        self.check_shape("array_factor phases", phases)?;
        check_angle("array_factor theta", theta)?;
        check_angle("array_factor phi", phi)?;

        let mut af = Complex64::new(0.0, 0.0);
        for n in 0..self.rows {
            for m in 0..self.cols {
                let psi = phases[n][m] + self.geometric_phase(n, m, theta, phi);
                af += amplitudes[n][m] * Complex64::cis(psi);
            }
        }
        Ok(af)
    }

    /// Evaluate with every amplitude equal to 1 (uniform illumination).
    pub fn evaluate_uniform(&self, phases: &[Vec<f64>], theta: f64, phi: f64) -> Result<Complex64> {
        let ones = vec![vec![1.0; self.cols]; self.rows];
        self.evaluate(&ones, phases, theta, phi)
    }

    fn check_shape(&self, op: &'static str, values: &[Vec<f64>]) -> Result<()> {
        let cols = values.first().map_or(0, Vec::len);
        if values.len() != self.rows || values.iter().any(|row| row.len() != self.cols) {
            return Err(BeamError::shape(op, (self.rows, self.cols), (values.len(), cols)));
        }
        Ok(())
    }
}

/// One-shot array factor; the grid shape is taken from `phases`.
pub fn array_factor(
    amplitudes: &[Vec<f64>],
    phases: &[Vec<f64>],
    wavelength: f64,
    spacing: f64,
    theta: f64,
    phi: f64,
) -> Result<Complex64> {
    let rows = phases.len();
    let cols = phases.first().map_or(0, Vec::len);
    ArrayGeometry::new(rows, cols, spacing, wavelength)?.evaluate(amplitudes, phases, theta, phi)
}
