//! AWMF-0108 beam-write command layout.
//!
//! A normal-operation write is 100 bits, sent as twenty 5-bit fields packed
//! LSB-first into bytes:
//!
//! ```text
//! bits    field
//!  0-9    control word            0
//! 10-19   NE RX phase, RX gain
//! 20-29   NE TX phase, TX gain
//! 30-49   SE RX pair, TX pair
//! 50-69   SW RX pair, TX pair
//! 70-89   NW RX pair, TX pair
//! 90-97   TX / RX TVGA            0
//! 98-99   telemetry disable, spare 0
//! ```
//!
//! Only the active direction's pair carries settings; the other pair is zero.

use std::collections::BTreeMap;

use crate::device::{Element, GainSetting, PhaseSetting};
use crate::error::Result;
use crate::packer::{self, Field, WordOrder};

// ---------------------------------------------------------------------------
// Enable line constants (DIO pin values)
// ---------------------------------------------------------------------------

pub const LINES_NONE: u8 = 0b00;
pub const LINES_TX_EN: u8 = 0b01;
pub const LINES_RX_EN: u8 = 0b10;

/// Operating mode of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Idle. Both enable lines low and nothing is programmed.
    Standby,
    /// Transmit: settings go in each channel's TX pair.
    Transmit,
    /// Receive only: settings go in each channel's RX pair.
    Receive,
}

impl Mode {
    /// RX_EN / TX_EN line state for this mode.
    pub fn enable_lines(self) -> u8 {
        match self {
            Self::Standby => LINES_NONE,
            Self::Transmit => LINES_TX_EN,
            Self::Receive => LINES_RX_EN,
        }
    }
}

/// How fields are laid out on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandFormat {
    pub field_bits: u8,
    pub word_bits: u8,
    pub order: WordOrder,
}

impl CommandFormat {
    /// 5-bit fields, bytes, first byte first.
    pub const AWMF_0108: Self = Self { field_bits: 5, word_bits: 8, order: WordOrder::LittleEndian };
}

impl Default for CommandFormat {
    fn default() -> Self {
        Self::AWMF_0108
    }
}

/// Phase and gain for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSettings {
    pub phase: PhaseSetting,
    pub gain: GainSetting,
}

/// Settings for every programmed channel. Channels missing from the map are
/// written as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeamSettings {
    channels: BTreeMap<Element, ChannelSettings>,
}

impl BeamSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, element: Element, phase: PhaseSetting, gain: GainSetting) {
        self.channels.insert(element, ChannelSettings { phase, gain });
    }

    pub fn get(&self, element: Element) -> Option<ChannelSettings> {
        self.channels.get(&element).copied()
    }

    /// Channels in wire order (NE, SE, SW, NW).
    pub fn iter(&self) -> impl Iterator<Item = (Element, ChannelSettings)> + '_ {
        self.channels.iter().map(|(&el, &cs)| (el, cs))
    }

    /// The twenty field values of a beam write for `mode`, in bit order.
    /// Standby programs nothing and yields an empty list.
    pub fn field_values(&self, mode: Mode) -> Vec<u16> {
        if mode == Mode::Standby {
            return Vec::new();
        }
        let mut values = vec![0, 0]; // control word
        for el in Element::ALL {
            let cs = self.get(el).unwrap_or_default();
            let pair = [u16::from(cs.phase.value()), u16::from(cs.gain.value())];
            let (rx, tx) = if mode == Mode::Receive { (pair, [0, 0]) } else { ([0, 0], pair) };
            values.extend_from_slice(&rx);
            values.extend_from_slice(&tx);
        }
        values.extend_from_slice(&[0, 0]); // TVGA, telemetry
        values
    }

    /// Pack the beam write for `mode` into bus words.
    pub fn encode(&self, mode: Mode, format: CommandFormat) -> Result<Vec<u8>> {
        let fields: Vec<Field> = self
            .field_values(mode)
            .into_iter()
            .map(|v| Field::new(v, format.field_bits))
            .collect();
        packer::pack(&fields, format.word_bits, format.order)
    }
}

impl FromIterator<(Element, ChannelSettings)> for BeamSettings {
    fn from_iter<I: IntoIterator<Item = (Element, ChannelSettings)>>(iter: I) -> Self {
        Self { channels: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::unpack;

    fn settings() -> BeamSettings {
        let mut s = BeamSettings::new();
        let g = |v| GainSetting::new(v).unwrap();
        let p = |v| PhaseSetting::new(v).unwrap();
        s.set(Element::Ne, p(5), g(9));
        s.set(Element::Se, p(6), g(10));
        s.set(Element::Sw, p(7), g(11));
        s.set(Element::Nw, p(8), g(12));
        s
    }

    #[test]
    fn receive_layout() {
        assert_eq!(
            settings().field_values(Mode::Receive),
            vec![0, 0, 5, 9, 0, 0, 6, 10, 0, 0, 7, 11, 0, 0, 8, 12, 0, 0, 0, 0]
        );
    }

    #[test]
    fn transmit_layout() {
        assert_eq!(
            settings().field_values(Mode::Transmit),
            vec![0, 0, 0, 0, 5, 9, 0, 0, 6, 10, 0, 0, 7, 11, 0, 0, 8, 12, 0, 0]
        );
    }

    #[test]
    fn standby_programs_nothing() {
        assert!(settings().field_values(Mode::Standby).is_empty());
        assert!(settings().encode(Mode::Standby, CommandFormat::AWMF_0108).unwrap().is_empty());
        assert_eq!(Mode::Standby.enable_lines(), LINES_NONE);
    }

    #[test]
    fn encoded_length_and_round_trip() {
        let bytes = settings().encode(Mode::Transmit, CommandFormat::AWMF_0108).unwrap();
        // 100 bits -> 13 bytes, last nibble padding
        assert_eq!(bytes.len(), 13);
        assert_eq!(bytes[12] >> 4, 0);
        let back = unpack(&bytes, &[5; 20], 8, WordOrder::LittleEndian).unwrap();
        assert_eq!(back, settings().field_values(Mode::Transmit));
    }

    #[test]
    fn receive_first_bytes() {
        // Control word is 10 zero bits, NE RX phase 5 sits in bits 10-14 and
        // the low bit of NE RX gain 9 lands in bit 15
        let bytes = settings().encode(Mode::Receive, CommandFormat::AWMF_0108).unwrap();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[1], 0b1001_0100);
    }

    #[test]
    fn missing_channels_are_zero() {
        let mut s = BeamSettings::new();
        s.set(Element::Se, PhaseSetting::new(3).unwrap(), GainSetting::UNIFORM);
        let values = s.field_values(Mode::Transmit);
        assert_eq!(&values[4..6], &[0u16, 0]);
        assert_eq!(&values[8..10], &[3u16, 1]);
    }

    #[test]
    fn enable_lines_per_mode() {
        assert_eq!(Mode::Transmit.enable_lines(), LINES_TX_EN);
        assert_eq!(Mode::Receive.enable_lines(), LINES_RX_EN);
    }
}
