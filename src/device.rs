//! AWMF-0108 device constants, channel names, and quantized settings.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use crate::error::{BeamError, Result};

/// Number of phase steps per turn (5-bit phase field).
pub const PHASE_STEPS: u8 = 32;

/// Number of gain steps (5-bit attenuation field).
pub const GAIN_STEPS: u8 = 32;

/// Radians per phase step.
pub const PHASE_INTERVAL: f64 = TAU / PHASE_STEPS as f64;

/// Attenuation per gain step, in dB.
pub const GAIN_STEP_DB: f64 = 1.0;

/// Maximum receive-path attenuation, in dB.
pub const MAX_RX_ATTENUATION_DB: f64 = 28.0;

/// Maximum transmit-path attenuation, in dB.
pub const MAX_TX_ATTENUATION_DB: f64 = 26.0;

/// One of the chip's four RF channels, named by quadrant.
///
/// Ordering follows the channel order of the device command (NE, SE, SW, NW),
/// so ordered maps keyed by `Element` iterate in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    #[cfg_attr(feature = "serde", serde(rename = "NE"))]
    Ne,
    #[cfg_attr(feature = "serde", serde(rename = "SE"))]
    Se,
    #[cfg_attr(feature = "serde", serde(rename = "SW"))]
    Sw,
    #[cfg_attr(feature = "serde", serde(rename = "NW"))]
    Nw,
}

impl Element {
    /// All channels in wire order.
    pub const ALL: [Element; 4] = [Self::Ne, Self::Se, Self::Sw, Self::Nw];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ne => "NE",
            Self::Se => "SE",
            Self::Sw => "SW",
            Self::Nw => "NW",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Element {
    type Err = BeamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NE" => Ok(Self::Ne),
            "SE" => Ok(Self::Se),
            "SW" => Ok(Self::Sw),
            "NW" => Ok(Self::Nw),
            other => Err(BeamError::InvalidGrid {
                reason: format!("unknown element name {other:?}"),
            }),
        }
    }
}

/// A quantized phase shift in device steps, always in `0..32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct PhaseSetting(u8);

impl PhaseSetting {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u32) -> Result<Self> {
        if value < u32::from(PHASE_STEPS) {
            Ok(Self(value as u8))
        } else {
            Err(BeamError::InvalidSetting {
                op: "PhaseSetting::new",
                value,
                range: u32::from(PHASE_STEPS),
            })
        }
    }

    /// Wrap any signed step count into range (Euclidean modulo 32).
    pub fn wrapping(steps: i64) -> Self {
        Self(steps.rem_euclid(i64::from(PHASE_STEPS)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PhaseSetting {
    type Error = BeamError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(u32::from(value))
    }
}

impl From<PhaseSetting> for u8 {
    fn from(s: PhaseSetting) -> u8 {
        s.0
    }
}

impl fmt::Display for PhaseSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A gain (attenuation) setting in device steps, always in `0..32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct GainSetting(u8);

impl GainSetting {
    /// Uniform illumination value used for every element.
    pub const UNIFORM: Self = Self(1);

    pub fn new(value: u32) -> Result<Self> {
        if value < u32::from(GAIN_STEPS) {
            Ok(Self(value as u8))
        } else {
            Err(BeamError::InvalidSetting {
                op: "GainSetting::new",
                value,
                range: u32::from(GAIN_STEPS),
            })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Attenuation in dB this setting requests.
    pub fn attenuation_db(self) -> f64 {
        f64::from(self.0) * GAIN_STEP_DB
    }
}

impl TryFrom<u8> for GainSetting {
    type Error = BeamError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(u32::from(value))
    }
}

impl From<GainSetting> for u8 {
    fn from(s: GainSetting) -> u8 {
        s.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_name_round_trip() {
        for el in Element::ALL {
            assert_eq!(el.name().parse::<Element>().unwrap(), el);
        }
        assert!("N".parse::<Element>().is_err());
    }

    #[test]
    fn element_order_is_wire_order() {
        let mut shuffled = vec![Element::Nw, Element::Ne, Element::Sw, Element::Se];
        shuffled.sort();
        assert_eq!(shuffled, Element::ALL);
    }

    #[test]
    fn phase_setting_range() {
        assert_eq!(PhaseSetting::new(31).unwrap().value(), 31);
        assert!(matches!(
            PhaseSetting::new(32),
            Err(BeamError::InvalidSetting { value: 32, .. })
        ));
        assert_eq!(PhaseSetting::wrapping(-1).value(), 31);
        assert_eq!(PhaseSetting::wrapping(32).value(), 0);
        assert_eq!(PhaseSetting::wrapping(70).value(), 6);
    }

    #[test]
    fn gain_setting_range() {
        assert_eq!(GainSetting::UNIFORM.value(), 1);
        assert!(GainSetting::new(32).is_err());
        assert_eq!(GainSetting::new(26).unwrap().attenuation_db(), 26.0);
    }
}
