//! Beam steering and SPI command packing for the AWMF-0108 four-channel
//! phased-array beamformer.

pub mod angle;
pub mod array_factor;
pub mod beam;
pub mod calibration;
pub mod command;
pub mod device;
pub mod error;
pub mod grid;
pub mod packer;
pub mod pattern;
pub mod steering;
pub mod transport;

pub use array_factor::{ArrayGeometry, array_factor};
pub use beam::{BeamDefinition, Solution};
pub use calibration::CalibrationTable;
pub use command::{BeamSettings, ChannelSettings, CommandFormat, Mode};
pub use device::{Element, GainSetting, PhaseSetting};
pub use error::{BeamError, Result};
pub use grid::ElementGrid;
pub use packer::{Field, WordOrder, pack, unpack};
pub use pattern::{PatternOptions, PatternSample};
pub use steering::{BruteForce, CancelFlag, PhaseSolver, ProjectedAngle, Target};
pub use transport::{CommandError, Commander, SimulatedDevice, Transport, TransportError};
