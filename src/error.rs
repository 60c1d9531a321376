use thiserror::Error;

/// Domain errors from steering, sampling, calibration and packing.
///
/// Every variant names the operation that rejected its input and carries the
/// offending value, so callers can decide whether to retry with corrected
/// input. Nothing in this crate clamps an out-of-contract value instead.
#[derive(Debug, Error)]
pub enum BeamError {
    #[error("{op}: wavelength must be positive and finite, got {value} m")]
    InvalidWavelength { op: &'static str, value: f64 },

    #[error("{op}: frequency must be positive and finite, got {value} Hz")]
    InvalidFrequency { op: &'static str, value: f64 },

    #[error("{op}: angle must be finite, got {value}")]
    InvalidAngle { op: &'static str, value: f64 },

    #[error("{op}: theta {theta_deg} deg is on the array plane (cos(theta) = 0)")]
    SteeringSingularity { op: &'static str, theta_deg: f64 },

    #[error("invalid element grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("{op}: expected {expected_rows}x{expected_cols} values, got {rows}x{cols}")]
    ShapeMismatch {
        op: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{op}: sample count must be at least 1, got {value}")]
    InvalidSampleCount { op: &'static str, value: usize },

    #[error("field width {width} outside supported range {min}..={max} bits")]
    FieldWidth { width: u8, min: u8, max: u8 },

    #[error("output word width {width} outside supported range 1..=8 bits")]
    WordWidth { width: u8 },

    #[error("field {index}: value {value} (0x{value:X}) does not fit in {width} bits")]
    FieldOverflow { index: usize, value: u16, width: u8 },

    #[error("unpack: need {need} bits, only {got} available")]
    Truncated { need: usize, got: usize },

    #[error("{op}: setting {value} outside 0..{range}")]
    InvalidSetting { op: &'static str, value: u32, range: u32 },

    #[error("brute-force search over {elements} elements exceeds the limit of {max}")]
    SearchTooLarge { elements: usize, max: usize },

    #[error("{op}: cancelled after {completed} of {total} outer iterations")]
    Cancelled { op: &'static str, completed: usize, total: usize },

    #[error("calibration table: {0}")]
    Calibration(String),
}

impl BeamError {
    /// Whether the error came from an aborted long-running search rather
    /// than from bad input.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn shape(
        op: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            op,
            expected_rows: expected.0,
            expected_cols: expected.1,
            rows: got.0,
            cols: got.1,
        }
    }
}

/// Reject non-positive or non-finite wavelengths.
pub(crate) fn check_wavelength(op: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BeamError::InvalidWavelength { op, value })
    }
}

/// Reject NaN and infinite angles.
pub(crate) fn check_angle(op: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BeamError::InvalidAngle { op, value })
    }
}

pub type Result<T> = std::result::Result<T, BeamError>;
