//! Rectangular element layouts.
//!
//! A grid places the chip's channels on the board:
//!
//! ```text
//! 2x2:  [[NW, NE],      1x4:  [[NE, NW, SE, SW]]
//!        [SW, SE]]
//! ```
//!
//! Row index grows north to south, column index west to east. Each position
//! also carries a phase-invert flag for feeds that are physically mirrored.

use crate::device::Element;
use crate::error::{BeamError, Result};

/// Default center-to-center element spacing, meters.
pub const DEFAULT_SPACING: f64 = 5.4e-3;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ElementGrid {
    elements: Vec<Vec<Element>>,
    invert: Vec<Vec<bool>>,
    spacing: f64,
}

impl ElementGrid {
    /// Build a grid, checking that it is non-empty and rectangular, that the
    /// invert pattern has the same shape, that no channel appears twice, and
    /// that the spacing is positive.
    pub fn new(elements: Vec<Vec<Element>>, invert: Vec<Vec<bool>>, spacing: f64) -> Result<Self> {
        let rows = elements.len();
        let cols = elements.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(BeamError::InvalidGrid { reason: "grid has no elements".into() });
        }
        if let Some(r) = elements.iter().position(|row| row.len() != cols) {
            return Err(BeamError::InvalidGrid {
                reason: format!("row {r} has {} elements, row 0 has {cols}", elements[r].len()),
            });
        }
        let invert_cols = invert.first().map_or(0, Vec::len);
        if invert.len() != rows || invert.iter().any(|row| row.len() != cols) {
            return Err(BeamError::shape("ElementGrid::new", (rows, cols), (invert.len(), invert_cols)));
        }

        let mut seen = Vec::with_capacity(rows * cols);
        for &el in elements.iter().flatten() {
            if seen.contains(&el) {
                return Err(BeamError::InvalidGrid { reason: format!("element {el} appears twice") });
            }
            seen.push(el);
        }

        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(BeamError::InvalidGrid {
                reason: format!("spacing must be positive and finite, got {spacing} m"),
            });
        }

        Ok(Self { elements, invert, spacing })
    }

    /// The 2x2 board: west column inverted.
    pub fn square() -> Self {
        Self {
            elements: vec![vec![Element::Nw, Element::Ne], vec![Element::Sw, Element::Se]],
            invert: vec![vec![true, false], vec![true, false]],
            spacing: DEFAULT_SPACING,
        }
    }

    /// The 1x4 inline board: every other element inverted.
    pub fn inline() -> Self {
        Self {
            elements: vec![vec![Element::Ne, Element::Nw, Element::Se, Element::Sw]],
            invert: vec![vec![true, false, true, false]],
            spacing: DEFAULT_SPACING,
        }
    }

    /// Same layout and spacing with every invert flag cleared.
    pub fn without_inverts(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            invert: self.invert.iter().map(|row| vec![false; row.len()]).collect(),
            spacing: self.spacing,
        }
    }

    pub fn rows(&self) -> usize {
        self.elements.len()
    }

    pub fn cols(&self) -> usize {
        self.elements[0].len()
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn element(&self, row: usize, col: usize) -> Element {
        self.elements[row][col]
    }

    pub fn is_inverted(&self, row: usize, col: usize) -> bool {
        self.invert[row][col]
    }

    /// Iterate `(row, col, element, inverted)` in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize, Element, bool)> + '_ {
        self.elements.iter().enumerate().flat_map(move |(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, &el)| (r, c, el, self.invert[r][c]))
        })
    }

    /// Row and column of a channel, if it is placed on this grid.
    pub fn locate(&self, element: Element) -> Option<(usize, usize)> {
        self.positions()
            .find(|&(_, _, el, _)| el == element)
            .map(|(r, c, _, _)| (r, c))
    }
}

impl Default for ElementGrid {
    fn default() -> Self {
        Self::square()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for grid in [ElementGrid::square(), ElementGrid::inline()] {
            let rebuilt = ElementGrid::new(
                grid.elements.clone(),
                grid.invert.clone(),
                grid.spacing,
            )
            .unwrap();
            assert_eq!(rebuilt, grid);
            assert_eq!(grid.len(), 4);
        }
        assert_eq!(ElementGrid::inline().rows(), 1);
        assert_eq!(ElementGrid::inline().cols(), 4);
    }

    #[test]
    fn positions_row_major() {
        let grid = ElementGrid::square();
        let order: Vec<_> = grid.positions().map(|(_, _, el, inv)| (el, inv)).collect();
        assert_eq!(
            order,
            vec![
                (Element::Nw, true),
                (Element::Ne, false),
                (Element::Sw, true),
                (Element::Se, false),
            ]
        );
        assert_eq!(grid.locate(Element::Se), Some((1, 1)));
    }

    #[test]
    fn rejects_ragged_grid() {
        let err = ElementGrid::new(
            vec![vec![Element::Ne, Element::Nw], vec![Element::Se]],
            vec![vec![false, false], vec![false]],
            DEFAULT_SPACING,
        )
        .unwrap_err();
        assert!(matches!(err, BeamError::InvalidGrid { .. }));
    }

    #[test]
    fn rejects_invert_shape_mismatch() {
        let err = ElementGrid::new(
            vec![vec![Element::Ne, Element::Nw]],
            vec![vec![false]],
            DEFAULT_SPACING,
        )
        .unwrap_err();
        assert!(matches!(err, BeamError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_duplicate_element() {
        let err = ElementGrid::new(
            vec![vec![Element::Ne, Element::Ne]],
            vec![vec![false, false]],
            DEFAULT_SPACING,
        )
        .unwrap_err();
        assert!(err.to_string().contains("appears twice"));
    }

    #[test]
    fn rejects_bad_spacing() {
        for spacing in [0.0, -1e-3, f64::NAN] {
            assert!(
                ElementGrid::new(vec![vec![Element::Ne]], vec![vec![false]], spacing).is_err()
            );
        }
    }

    #[test]
    fn clearing_inverts_keeps_layout() {
        let grid = ElementGrid::square().without_inverts();
        assert!(grid.positions().all(|(_, _, _, inv)| !inv));
        assert_eq!(grid.element(0, 0), Element::Nw);
    }
}
