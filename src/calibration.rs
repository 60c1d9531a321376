//! Per-element phase calibration.
//!
//! A table maps each channel to measured errors at a handful of nominal
//! phase settings: `cal[element][setting] = measured - setting`, in device
//! steps. A computed setting is corrected with the entry whose key is nearest
//! to it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::device::{Element, PhaseSetting};

/// Immutable element -> (nominal setting -> correction) lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct CalibrationTable {
    entries: BTreeMap<Element, BTreeMap<PhaseSetting, i32>>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; later inserts for the same key replace earlier ones.
    pub fn with_entry(mut self, element: Element, setting: PhaseSetting, correction: i32) -> Self {
        self.entries.entry(element).or_default().insert(setting, correction);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Corrections recorded for one channel, keyed by nominal setting.
    pub fn element(&self, element: Element) -> Option<&BTreeMap<PhaseSetting, i32>> {
        self.entries.get(&element)
    }

    /// The entry nearest to `setting` for `element`, as `(key, correction)`.
    ///
    /// Keys are scanned in ascending order and a later key only wins with a
    /// strictly smaller distance, so a tie goes to the lower key.
    pub fn nearest(&self, element: Element, setting: PhaseSetting) -> Option<(PhaseSetting, i32)> {
        let target = i32::from(setting.value());
        let mut best: Option<(PhaseSetting, i32, i32)> = None;
        for (&key, &correction) in self.entries.get(&element)? {
            let distance = (i32::from(key.value()) - target).abs();
            match best {
                Some((_, _, d)) if distance >= d => {}
                _ => best = Some((key, correction, distance)),
            }
        }
        best.map(|(key, correction, _)| (key, correction))
    }

    /// Load a JSON table shaped like `{"NE": {"0": 3, "5": -2}, ...}`.
    ///
    /// A missing file means no calibration for this board and yields
    /// `Ok(None)`. Unreadable or malformed files are errors.
    #[cfg(feature = "calfile")]
    pub fn load_json(path: impl AsRef<std::path::Path>) -> crate::error::Result<Option<Self>> {
        use crate::error::BeamError;

        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no phase calibration file found");
                return Ok(None);
            }
            Err(e) => {
                return Err(BeamError::Calibration(format!("{}: {e}", path.display())));
            }
        };
        Self::from_json(&text).map(Some)
    }

    /// Parse a JSON table (see [`load_json`](Self::load_json)).
    #[cfg(feature = "calfile")]
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        serde_json::from_str(text).map_err(|e| crate::error::BeamError::Calibration(e.to_string()))
    }
}

impl FromIterator<(Element, PhaseSetting, i32)> for CalibrationTable {
    fn from_iter<I: IntoIterator<Item = (Element, PhaseSetting, i32)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |table, (el, s, c)| table.with_entry(el, s, c))
    }
}

/// Correct a nominal setting for one channel.
///
/// With no table, or no entries for this channel, the setting passes through
/// unchanged. Otherwise the nearest entry's correction is subtracted, modulo 32.
pub fn apply(element: Element, nominal: PhaseSetting, table: Option<&CalibrationTable>) -> PhaseSetting {
    let Some(table) = table else {
        return nominal;
    };
    let Some((key, correction)) = table.nearest(element, nominal) else {
        debug!(%element, "no calibration entries for element, passing through");
        return nominal;
    };

    if correction != 0 {
        if key != nominal {
            debug!(%element, used = %key, instead_of = %nominal, "calibration key substituted");
        }
        debug!(%element, correction, "applying calibration");
    }
    PhaseSetting::wrapping(i64::from(nominal.value()) - i64::from(correction))
}
