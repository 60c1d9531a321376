//! Radiation pattern sweeps for display and diagnostics.

use crate::array_factor::ArrayGeometry;
use crate::error::{BeamError, Result};

/// One point of a pattern sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternSample {
    pub theta_deg: f64,
    pub phi_deg: f64,
    /// `|AF|`, divided by the sweep maximum when normalized.
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternOptions {
    /// Sweep theta over `[0, 180)` instead of `[0, 90)`.
    pub back_lobes: bool,
    /// Scale magnitudes so the strongest sample is 1.
    pub normalized: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self { back_lobes: false, normalized: true }
    }
}

/// Sweep the array factor over a theta/phi raster.
///
/// Theta takes `n_theta` evenly spaced values from 0 up to (not including)
/// 90° or 180°, phi takes `n_phi` values over `[0, 360)`. Phi varies fastest,
/// so the output is `n_theta` rows of `n_phi` samples each.
///
/// If every magnitude is zero, normalization is skipped and the zeros are
/// returned as-is.
pub fn sample(
    geometry: &ArrayGeometry,
    amplitudes: &[Vec<f64>],
    phases: &[Vec<f64>],
    n_theta: usize,
    n_phi: usize,
    options: PatternOptions,
) -> Result<Vec<PatternSample>> {
    if n_theta == 0 {
        return Err(BeamError::InvalidSampleCount { op: "pattern n_theta", value: n_theta });
    }
    if n_phi == 0 {
        return Err(BeamError::InvalidSampleCount { op: "pattern n_phi", value: n_phi });
    }

    let theta_max = if options.back_lobes { 180.0 } else { 90.0 };
    let theta_step = theta_max / n_theta as f64;
    let phi_step = 360.0 / n_phi as f64;

    let mut samples = Vec::with_capacity(n_theta * n_phi);
    let mut peak = 0.0f64;
    for i in 0..n_theta {
        let theta_deg = i as f64 * theta_step;
        for j in 0..n_phi {
            let phi_deg = j as f64 * phi_step;
            let magnitude = geometry
                .evaluate(amplitudes, phases, theta_deg.to_radians(), phi_deg.to_radians())?
                .norm();
            peak = peak.max(magnitude);
            samples.push(PatternSample { theta_deg, phi_deg, magnitude });
        }
    }

    if options.normalized && peak > 0.0 {
        for s in &mut samples {
            s.magnitude /= peak;
        }
    }
    Ok(samples)
}

/// The strongest sample of a sweep, first one wins on ties.
pub fn peak(samples: &[PatternSample]) -> Option<PatternSample> {
    samples.iter().copied().fold(None, |best, s| match best {
        Some(b) if b.magnitude >= s.magnitude => Some(b),
        _ => Some(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDA: f64 = 0.010_706_873_5;

    fn square() -> ArrayGeometry {
        ArrayGeometry::new(2, 2, 5.4e-3, LAMBDA).unwrap()
    }

    fn ones() -> Vec<Vec<f64>> {
        vec![vec![1.0; 2]; 2]
    }

    #[test]
    fn raster_order_phi_fastest() {
        let phases = vec![vec![0.0; 2]; 2];
        let samples = sample(&square(), &ones(), &phases, 3, 4, PatternOptions::default()).unwrap();
        assert_eq!(samples.len(), 12);
        let coords: Vec<(f64, f64)> = samples.iter().take(5).map(|s| (s.theta_deg, s.phi_deg)).collect();
        assert_eq!(coords, vec![(0.0, 0.0), (0.0, 90.0), (0.0, 180.0), (0.0, 270.0), (30.0, 0.0)]);
        assert_eq!(samples.last().map(|s| s.theta_deg), Some(60.0));
    }

    #[test]
    fn normalized_peak_is_one_at_broadside() {
        let phases = vec![vec![0.0; 2]; 2];
        let samples = sample(&square(), &ones(), &phases, 9, 12, PatternOptions::default()).unwrap();
        assert!(samples.iter().all(|s| (0.0..=1.0 + 1e-12).contains(&s.magnitude)));
        let top = peak(&samples).unwrap();
        assert_eq!(top.theta_deg, 0.0);
        assert!((top.magnitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unnormalized_keeps_raw_magnitude() {
        let phases = vec![vec![0.0; 2]; 2];
        let opts = PatternOptions { normalized: false, ..Default::default() };
        let samples = sample(&square(), &ones(), &phases, 2, 2, opts).unwrap();
        assert!((samples[0].magnitude - 4.0).abs() < 1e-12);
    }

    #[test]
    fn back_lobes_extend_theta() {
        let phases = vec![vec![0.0; 2]; 2];
        let opts = PatternOptions { back_lobes: true, ..Default::default() };
        let samples = sample(&square(), &ones(), &phases, 4, 1, opts).unwrap();
        let thetas: Vec<f64> = samples.iter().map(|s| s.theta_deg).collect();
        assert_eq!(thetas, vec![0.0, 45.0, 90.0, 135.0]);
    }

    #[test]
    fn all_zero_pattern_not_normalized() {
        let phases = vec![vec![0.0; 2]; 2];
        let dark = vec![vec![0.0; 2]; 2];
        let samples = sample(&square(), &dark, &phases, 3, 3, PatternOptions::default()).unwrap();
        assert_eq!(samples.len(), 9);
        assert!(samples.iter().all(|s| s.magnitude == 0.0));
    }

    #[test]
    fn zero_counts_rejected() {
        let phases = vec![vec![0.0; 2]; 2];
        assert!(matches!(
            sample(&square(), &ones(), &phases, 0, 4, PatternOptions::default()),
            Err(BeamError::InvalidSampleCount { value: 0, .. })
        ));
        assert!(sample(&square(), &ones(), &phases, 4, 0, PatternOptions::default()).is_err());
    }
}
