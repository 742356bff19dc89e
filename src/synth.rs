//! Frequency Synthesizer Interface
//!
//! The control core drives the transmitter through the [`Synthesizer`]
//! trait. Frequencies are in hundredths of a Hertz, the resolution the
//! beacon's tone spacing needs.

pub mod plan;

use crate::config::SynthCalibration;

/// Clock output identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockOutput {
    /// CLK0 output
    Clk0,
    /// CLK1 output
    Clk1,
    /// CLK2 output
    Clk2,
}

impl ClockOutput {
    /// All outputs, in register order
    pub const ALL: [Self; 3] = [Self::Clk0, Self::Clk1, Self::Clk2];

    /// Output number (0-2)
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Clk0 => 0,
            Self::Clk1 => 1,
            Self::Clk2 => 2,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ClockOutput {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Clk0 => defmt::write!(f, "CLK0"),
            Self::Clk1 => defmt::write!(f, "CLK1"),
            Self::Clk2 => defmt::write!(f, "CLK2"),
        }
    }
}

/// Drive strength setting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveStrength {
    /// 2mA drive
    Drive2mA,
    /// 4mA drive
    Drive4mA,
    /// 6mA drive
    Drive6mA,
    /// 8mA drive (maximum)
    #[default]
    Drive8mA,
}

impl DriveStrength {
    /// Register field value (CLKx_IDRV)
    #[must_use]
    pub const fn as_reg(self) -> u8 {
        match self {
            Self::Drive2mA => 0,
            Self::Drive4mA => 1,
            Self::Drive6mA => 2,
            Self::Drive8mA => 3,
        }
    }
}

/// Crystal load capacitance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrystalLoad {
    /// 6 pF load
    Load6pF,
    /// 8 pF load
    Load8pF,
    /// 10 pF load
    #[default]
    Load10pF,
}

impl CrystalLoad {
    /// Register value (XTAL_CL, with the reserved low bits set)
    #[must_use]
    pub const fn as_reg(self) -> u8 {
        match self {
            Self::Load6pF => 0b0101_0010,
            Self::Load8pF => 0b1001_0010,
            Self::Load10pF => 0b1101_0010,
        }
    }
}

/// A programmable clock source the symbol emitter can key
///
/// Implementations own the device for as long as they are borrowed, so
/// holding `&mut` for a whole transmission gives the emitter exclusive
/// access.
#[allow(async_fn_in_trait)]
pub trait Synthesizer {
    /// Device or bus error
    type Error;

    /// Reset the device and apply the reference calibration
    async fn init(&mut self, calibration: SynthCalibration) -> Result<(), Self::Error>;

    /// Set the output drive strength
    async fn set_drive_strength(
        &mut self,
        output: ClockOutput,
        drive: DriveStrength,
    ) -> Result<(), Self::Error>;

    /// Program an output frequency in hundredths of a Hertz
    async fn set_frequency(&mut self, centihertz: u64, output: ClockOutput)
        -> Result<(), Self::Error>;

    /// Enable or disable an output
    async fn enable_output(&mut self, output: ClockOutput, enabled: bool)
        -> Result<(), Self::Error>;
}
