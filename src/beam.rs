//! Beam definition: direction, wavelength, and antenna in; device settings out.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use tracing::debug;

use crate::angle::to_device_setting;
use crate::array_factor::ArrayGeometry;
use crate::calibration::{self, CalibrationTable};
use crate::command::BeamSettings;
use crate::device::{Element, GainSetting, PhaseSetting};
use crate::error::{BeamError, Result};
use crate::grid::ElementGrid;
use crate::pattern::{self, PatternOptions, PatternSample};
use crate::steering::{PhaseSolver, ProjectedAngle, Target};

/// Output of one solve, kept until a mutator invalidates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Physical phase per grid position in radians, before inverts.
    pub raw_phases: Vec<Vec<f64>>,
    /// Calibrated device setting per channel, after inverts.
    pub phases: BTreeMap<Element, PhaseSetting>,
}

/// Steering state for one antenna: where to point, at what wavelength, with
/// which board and calibration.
///
/// Settings are computed on first request and cached. Every setter clears
/// the cache; [`invalidate`](Self::invalidate) and
/// [`recompute`](Self::recompute) control it explicitly.
///
/// ```
/// use awmf_beam::{BeamDefinition, Element};
/// use awmf_beam::angle::wavelength_from_frequency;
///
/// let mut beam = BeamDefinition::new(0.0, 0.0, wavelength_from_frequency(28e9)?)?;
/// let phases = beam.phase_settings()?;
/// // Broadside: the inverted west column sits half a turn from the east
/// assert_eq!(phases[&Element::Ne].value(), 0);
/// assert_eq!(phases[&Element::Nw].value(), 16);
/// # Ok::<(), awmf_beam::BeamError>(())
/// ```
pub struct BeamDefinition {
    target: Target,
    grid: ElementGrid,
    calibration: Option<CalibrationTable>,
    solver: Box<dyn PhaseSolver>,
    cache: Option<Solution>,
    gains: Option<BTreeMap<Element, GainSetting>>,
}

impl BeamDefinition {
    /// `theta_deg` from broadside, `phi_deg` azimuth from north, wavelength
    /// in meters. Uses the 2x2 board, no calibration, and the closed-form
    /// solver.
    pub fn new(theta_deg: f64, phi_deg: f64, wavelength: f64) -> Result<Self> {
        Ok(Self {
            target: Target::from_degrees(theta_deg, phi_deg, wavelength)?,
            grid: ElementGrid::default(),
            calibration: None,
            solver: Box::new(ProjectedAngle),
            cache: None,
            gains: None,
        })
    }

    pub fn with_grid(mut self, grid: ElementGrid) -> Self {
        self.set_antenna(grid);
        self
    }

    /// Attach a calibration table. `None` means uncorrected settings.
    pub fn with_calibration(mut self, table: Option<CalibrationTable>) -> Self {
        self.calibration = table;
        self.invalidate();
        self
    }

    pub fn with_solver(mut self, solver: impl PhaseSolver + 'static) -> Self {
        self.set_solver(solver);
        self
    }

    // -----------------------------------------------------------------------
    // Mutators (all invalidate)
    // -----------------------------------------------------------------------

    pub fn set_direction(&mut self, theta_deg: f64, phi_deg: f64) -> Result<()> {
        self.target = Target::from_degrees(theta_deg, phi_deg, self.target.wavelength())?;
        self.invalidate();
        Ok(())
    }

    pub fn set_wavelength(&mut self, wavelength: f64) -> Result<()> {
        self.target = self.target.with_wavelength(wavelength)?;
        self.invalidate();
        Ok(())
    }

    /// Replace the antenna layout, spacing, and invert pattern.
    pub fn set_antenna(&mut self, grid: ElementGrid) {
        self.grid = grid;
        self.invalidate();
    }

    pub fn set_solver(&mut self, solver: impl PhaseSolver + 'static) {
        self.solver = Box::new(solver);
        self.invalidate();
    }

    /// Drop cached phase and gain settings.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.gains = None;
    }

    /// Solve now, replacing any cached result.
    pub fn recompute(&mut self) -> Result<&Solution> {
        self.invalidate();
        self.solution()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn grid(&self) -> &ElementGrid {
        &self.grid
    }

    pub fn calibration(&self) -> Option<&CalibrationTable> {
        self.calibration.as_ref()
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Cached solution, solving first if needed.
    pub fn solution(&mut self) -> Result<&Solution> {
        let solution = match self.cache.take() {
            Some(s) => s,
            None => self.solve()?,
        };
        Ok(self.cache.insert(solution))
    }

    /// Calibrated device phase setting per channel.
    pub fn phase_settings(&mut self) -> Result<&BTreeMap<Element, PhaseSetting>> {
        Ok(&self.solution()?.phases)
    }

    /// Physical phases in radians, shaped like the grid, without inverts.
    pub fn raw_phases(&mut self) -> Result<&[Vec<f64>]> {
        Ok(&self.solution()?.raw_phases)
    }

    /// Gain per channel. Illumination is uniform, so every channel gets
    /// [`GainSetting::UNIFORM`].
    pub fn gain_settings(&mut self) -> &BTreeMap<Element, GainSetting> {
        let grid = &self.grid;
        self.gains.get_or_insert_with(|| {
            grid.positions().map(|(_, _, el, _)| (el, GainSetting::UNIFORM)).collect()
        })
    }

    /// Phase and gain per channel, ready for a beam write.
    pub fn beam_settings(&mut self) -> Result<BeamSettings> {
        let phases = self.phase_settings()?.clone();
        let gains = self.gain_settings();
        let mut settings = BeamSettings::new();
        for (el, phase) in phases {
            settings.set(el, phase, gains.get(&el).copied().unwrap_or(GainSetting::UNIFORM));
        }
        Ok(settings)
    }

    /// Sweep the radiation pattern of the current solution.
    ///
    /// Uses the raw phases, so the pattern shows what the array radiates
    /// rather than the device register values.
    pub fn sample_pattern(
        &mut self,
        n_theta: usize,
        n_phi: usize,
        options: PatternOptions,
    ) -> Result<Vec<PatternSample>> {
        let geometry = ArrayGeometry::for_grid(&self.grid, self.target.wavelength())?;
        let amplitudes = vec![vec![1.0; self.grid.cols()]; self.grid.rows()];
        let raw = self.raw_phases()?;
        pattern::sample(&geometry, &amplitudes, raw, n_theta, n_phi, options)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn solve(&self) -> Result<Solution> {
        let raw_phases = self.solver.solve(&self.grid, &self.target)?;
        let (rows, cols) = (self.grid.rows(), self.grid.cols());
        if raw_phases.len() != rows || raw_phases.iter().any(|row| row.len() != cols) {
            let got_cols = raw_phases.first().map_or(0, Vec::len);
            return Err(BeamError::shape(
                "BeamDefinition::solve",
                (rows, cols),
                (raw_phases.len(), got_cols),
            ));
        }
        let mut phases = BTreeMap::new();
        for (r, c, el, inverted) in self.grid.positions() {
            let physical = raw_phases[r][c];
            let shifted = if inverted { physical + PI } else { physical };
            let nominal = to_device_setting(shifted);
            phases.insert(el, calibration::apply(el, nominal, self.calibration.as_ref()));
        }
        debug!(
            solver = self.solver.name(),
            theta_deg = self.target.theta().to_degrees(),
            phi_deg = self.target.phi().to_degrees(),
            ?phases,
            "phase settings computed"
        );
        Ok(Solution { raw_phases, phases })
    }
}

impl fmt::Debug for BeamDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeamDefinition")
            .field("target", &self.target)
            .field("grid", &self.grid)
            .field("calibration", &self.calibration.is_some())
            .field("solver", &self.solver.name())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
