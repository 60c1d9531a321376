//! Phase solvers: turn a pointing direction into per-element phase offsets.
//!
//! Two strategies share the [`PhaseSolver`] trait:
//!
//! - [`ProjectedAngle`]: closed form, used for real steering.
//! - [`BruteForce`]: exhaustive search over every combination of device
//!   phase steps. Exponential in the element count; only a reference oracle
//!   for checking the closed form on small grids.
//!
//! Both return *physical* phases in radians, laid out like the grid, before
//! any phase-invert flip, quantization, or calibration.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use num_complex::Complex64;
use tracing::debug;

use crate::angle::setting_to_radians;
use crate::array_factor::ArrayGeometry;
use crate::device::{PHASE_STEPS, PhaseSetting};
use crate::error::{BeamError, Result, check_angle, check_wavelength};
use crate::grid::ElementGrid;

/// Largest grid the brute-force search accepts (32^5 ≈ 33.5M evaluations).
pub const MAX_SEARCH_ELEMENTS: usize = 5;

/// Pointing direction and carrier wavelength. Angles are stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    theta: f64,
    phi: f64,
    wavelength: f64,
}

impl Target {
    /// `theta_deg` is the polar offset from broadside, `phi_deg` the azimuth
    /// (0 = north). `wavelength` is in meters.
    pub fn from_degrees(theta_deg: f64, phi_deg: f64, wavelength: f64) -> Result<Self> {
        check_angle("Target theta", theta_deg)?;
        check_angle("Target phi", phi_deg)?;
        let wavelength = check_wavelength("Target", wavelength)?;
        Ok(Self { theta: theta_deg.to_radians(), phi: phi_deg.to_radians(), wavelength })
    }

    /// Same direction at another wavelength.
    pub fn with_wavelength(self, wavelength: f64) -> Result<Self> {
        let wavelength = check_wavelength("Target", wavelength)?;
        Ok(Self { wavelength, ..self })
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }
}

/// Computes raw per-element phase offsets (radians, grid-shaped) that steer
/// the main lobe toward a target.
pub trait PhaseSolver: fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn solve(&self, grid: &ElementGrid, target: &Target) -> Result<Vec<Vec<f64>>>;
}

// ---------------------------------------------------------------------------
// Closed form
// ---------------------------------------------------------------------------

/// Phase increments between adjacent columns (east-west) and rows
/// (north-south).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarOffsets {
    pub ew: f64,
    pub ns: f64,
}

/// Closed-form steering by projecting the direction onto two planar angles.
///
/// ```text
/// ew_angle = atan(sin φ · sin θ / cos θ)
/// ns_angle = atan(cos φ · sin θ / cos θ)
/// ew = -k·d·sin(ew_angle),  ns = -k·d·sin(ns_angle)
/// phase(i, j) = i·ns + j·ew
/// ```
///
/// This treats east-west and north-south steering as separable. It is a
/// small-angle approximation rather than an exact spherical projection; its
/// error against [`BruteForce`] is checked in the tests, not corrected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectedAngle;

impl ProjectedAngle {
    pub fn planar_offsets(&self, spacing: f64, target: &Target) -> Result<PlanarOffsets> {
        let (t, p) = (target.theta, target.phi);
        if t.cos().abs() < f64::EPSILON {
            return Err(BeamError::SteeringSingularity {
                op: "ProjectedAngle",
                theta_deg: t.to_degrees(),
            });
        }
        let ew_angle = (p.sin() * t.sin() / t.cos()).atan();
        let ns_angle = (p.cos() * t.sin() / t.cos()).atan();

        let k = std::f64::consts::TAU / target.wavelength;
        Ok(PlanarOffsets {
            ew: -k * spacing * ew_angle.sin(),
            ns: -k * spacing * ns_angle.sin(),
        })
    }
}

impl PhaseSolver for ProjectedAngle {
    fn name(&self) -> &'static str {
        "projected-angle"
    }

    fn solve(&self, grid: &ElementGrid, target: &Target) -> Result<Vec<Vec<f64>>> {
        let off = self.planar_offsets(grid.spacing(), target)?;
        debug!(ew = off.ew, ns = off.ns, "planar phase offsets");
        Ok((0..grid.rows())
            .map(|i| (0..grid.cols()).map(|j| i as f64 * off.ns + j as f64 * off.ew).collect())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Brute force
// ---------------------------------------------------------------------------

/// Shared flag for aborting a long search from elsewhere.
///
/// Clones share state; setting any clone cancels every search holding one.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Best combination found by [`BruteForce::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Winning phase step per element, row-major.
    pub settings: Vec<PhaseSetting>,
    /// `|AF|` at the target for those settings.
    pub magnitude: f64,
}

/// Exhaustive search of every phase-step combination for the one that
/// maximizes `|AF|` at the target.
///
/// Combinations are enumerated like an odometer with element 0 (row-major)
/// as the slowest digit. Only a strictly greater magnitude replaces the
/// current best, so the earliest maximum wins ties. The cancel flag is
/// checked after each value of the slowest digit.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    cancel: CancelFlag,
}

impl BruteForce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancelFlag) -> Self {
        Self { cancel }
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn search(&self, grid: &ElementGrid, target: &Target) -> Result<SearchResult> {
        let n = grid.len();
        if n > MAX_SEARCH_ELEMENTS {
            return Err(BeamError::SearchTooLarge { elements: n, max: MAX_SEARCH_ELEMENTS });
        }
        let geo = ArrayGeometry::for_grid(grid, target.wavelength)?;
        let steps = usize::from(PHASE_STEPS);

        // phasor[e][s] = exp(j·(s·Δ + geometric phase of e)), the per-element
        // term of the array factor with unit amplitude
        let phasors: Vec<Vec<Complex64>> = geo
            .geometric_phases(target.theta, target.phi)
            .into_iter()
            .map(|g| {
                (0..steps)
                    .map(|s| Complex64::cis(setting_to_radians(step(s)) + g))
                    .collect()
            })
            .collect();

        let inner_total = steps.pow((n - 1) as u32);
        let mut digits = vec![0usize; n];
        let mut best_digits = digits.clone();
        let mut best = f64::NEG_INFINITY;

        for first in 0..steps {
            digits[0] = first;
            for combo in 0..inner_total {
                let mut rest = combo;
                for e in (1..n).rev() {
                    digits[e] = rest % steps;
                    rest /= steps;
                }
                let af: Complex64 = digits.iter().enumerate().map(|(e, &s)| phasors[e][s]).sum();
                let mag = af.norm();
                if mag > best {
                    best = mag;
                    best_digits.copy_from_slice(&digits);
                }
            }
            if self.cancel.is_cancelled() {
                return Err(BeamError::Cancelled {
                    op: "BruteForce::search",
                    completed: first + 1,
                    total: steps,
                });
            }
        }

        let settings: Vec<PhaseSetting> = best_digits.into_iter().map(step).collect();
        debug!(?settings, magnitude = best, "brute-force search complete");
        Ok(SearchResult { settings, magnitude: best })
    }
}

impl PhaseSolver for BruteForce {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn solve(&self, grid: &ElementGrid, target: &Target) -> Result<Vec<Vec<f64>>> {
        let result = self.search(grid, target)?;
        Ok(result
            .settings
            .chunks(grid.cols())
            .map(|row| row.iter().map(|&s| setting_to_radians(s)).collect())
            .collect())
    }
}

fn step(s: usize) -> PhaseSetting {
    PhaseSetting::wrapping(s as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::{SPEED_OF_LIGHT, to_device_setting};
    use crate::device::Element;

    fn lambda_28ghz() -> f64 {
        SPEED_OF_LIGHT / 28e9
    }

    fn uniform_af(grid: &ElementGrid, target: &Target, phases: &[Vec<f64>]) -> f64 {
        ArrayGeometry::for_grid(grid, target.wavelength())
            .unwrap()
            .evaluate_uniform(phases, target.theta(), target.phi())
            .unwrap()
            .norm()
    }

    #[test]
    fn broadside_offsets_equal_for_any_phi() {
        for phi in [0.0, 20.0, 90.0, 135.0, 270.0, -45.0] {
            let target = Target::from_degrees(0.0, phi, lambda_28ghz()).unwrap();
            for grid in [ElementGrid::square(), ElementGrid::inline()] {
                let raw = ProjectedAngle.solve(&grid, &target).unwrap();
                let first = raw[0][0];
                assert!(raw.iter().flatten().all(|&v| (v - first).abs() < 1e-12), "phi {phi}: {raw:?}");
            }
        }
    }

    #[test]
    fn golden_fixture_15_20() {
        let target = Target::from_degrees(15.0, 20.0, lambda_28ghz()).unwrap();
        let grid = ElementGrid::square().without_inverts();

        let off = ProjectedAngle.planar_offsets(grid.spacing(), &target).unwrap();
        assert!(off.ew.abs() > 1e-3 && off.ns.abs() > 1e-3);
        assert!((off.ew - -0.289_200_454).abs() < 1e-6, "ew {}", off.ew);
        assert!((off.ns - -0.773_751_095).abs() < 1e-6, "ns {}", off.ns);

        let raw = ProjectedAngle.solve(&grid, &target).unwrap();
        let settings: Vec<(Element, u8)> = grid
            .positions()
            .map(|(r, c, el, _)| (el, to_device_setting(raw[r][c]).value()))
            .collect();
        assert_eq!(
            settings,
            vec![(Element::Nw, 0), (Element::Ne, 31), (Element::Sw, 28), (Element::Se, 27)]
        );
        assert!(settings.iter().all(|&(_, s)| s < 32));
    }

    #[test]
    fn rows_accumulate_ns_and_columns_ew() {
        let target = Target::from_degrees(25.0, 60.0, lambda_28ghz()).unwrap();
        let grid = ElementGrid::square();
        let off = ProjectedAngle.planar_offsets(grid.spacing(), &target).unwrap();
        let raw = ProjectedAngle.solve(&grid, &target).unwrap();
        assert_eq!(raw[0][0], 0.0);
        assert!((raw[0][1] - off.ew).abs() < 1e-12);
        assert!((raw[1][0] - off.ns).abs() < 1e-12);
        assert!((raw[1][1] - (off.ns + off.ew)).abs() < 1e-12);
    }

    #[test]
    fn phi_90_steers_only_east_west() {
        let target = Target::from_degrees(30.0, 90.0, lambda_28ghz()).unwrap();
        let off = ProjectedAngle.planar_offsets(5.4e-3, &target).unwrap();
        assert!(off.ns.abs() < 1e-12);
        assert!(off.ew < 0.0);
    }

    #[test]
    fn theta_90_is_singular() {
        let target = Target::from_degrees(90.0, 0.0, lambda_28ghz()).unwrap();
        let err = ProjectedAngle.planar_offsets(5.4e-3, &target).unwrap_err();
        assert!(matches!(err, BeamError::SteeringSingularity { .. }));
    }

    #[test]
    fn target_rejects_bad_input() {
        assert!(Target::from_degrees(10.0, 0.0, 0.0).is_err());
        assert!(Target::from_degrees(f64::NAN, 0.0, 0.01).is_err());
    }

    #[test]
    fn brute_force_bounds_closed_form_at_broadside() {
        let target = Target::from_degrees(0.0, 0.0, lambda_28ghz()).unwrap();
        let grid = ElementGrid::square().without_inverts();

        let oracle = BruteForce::new().search(&grid, &target).unwrap();
        let closed = ProjectedAngle.solve(&grid, &target).unwrap();
        let closed_af = uniform_af(&grid, &target, &closed);

        assert!((closed_af - 4.0).abs() < 1e-9);
        assert!(oracle.magnitude >= closed_af - 1e-9);
        // Broadside optimum is all elements in phase
        let first = oracle.settings[0];
        assert!(oracle.settings.iter().all(|&s| s == first));
    }

    #[test]
    fn brute_force_close_to_closed_form_off_axis() {
        let target = Target::from_degrees(15.0, 20.0, lambda_28ghz()).unwrap();
        let grid = ElementGrid::square().without_inverts();

        let oracle = BruteForce::new().search(&grid, &target).unwrap();
        let closed: Vec<Vec<f64>> = ProjectedAngle
            .solve(&grid, &target)
            .unwrap()
            .iter()
            .map(|row| row.iter().map(|&r| setting_to_radians(to_device_setting(r))).collect())
            .collect();
        let closed_af = uniform_af(&grid, &target, &closed);

        assert!(oracle.magnitude >= closed_af - 1e-9);
        // Quantized closed form stays within a few percent of the optimum
        assert!(closed_af / oracle.magnitude > 0.95, "{closed_af} vs {}", oracle.magnitude);
    }

    #[test]
    fn brute_force_solve_returns_grid_shape() {
        let target = Target::from_degrees(10.0, 45.0, lambda_28ghz()).unwrap();
        let grid = ElementGrid::new(
            vec![vec![Element::Ne, Element::Nw]],
            vec![vec![false, false]],
            5.4e-3,
        )
        .unwrap();
        let raw = BruteForce::new().solve(&grid, &target).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].len(), 2);
        // Deterministic
        assert_eq!(raw, BruteForce::new().solve(&grid, &target).unwrap());
    }

    #[test]
    fn brute_force_honors_cancel() {
        let target = Target::from_degrees(0.0, 0.0, lambda_28ghz()).unwrap();
        let flag = CancelFlag::new();
        flag.cancel();
        let solver = BruteForce::with_cancel(flag.clone());
        let err = solver.search(&ElementGrid::inline(), &target).unwrap_err();
        assert!(matches!(err, BeamError::Cancelled { completed: 1, total: 32, .. }));

        flag.reset();
        assert!(!solver.cancel_flag().is_cancelled());
    }
}
