//! `Si5351A` Clock Synthesizer Driver
//!
//! Drives the transmitter from CLK0. All outputs run from PLL A; the
//! multisynth holds an even integer divisor and the tone is set through
//! the PLL fraction, so steps between WSPR tones on one band rewrite only
//! the eight PLL registers and need no PLL reset.

use core::fmt;

use embedded_hal_async::i2c::I2c;

use crate::config::{SynthCalibration, SI5351_XTAL_FREQ};
use crate::hal::i2c::{I2cAddress, I2cBus};
use crate::synth::plan::{plan_centihertz, MsParams};
use crate::synth::{ClockOutput, DriveStrength, Synthesizer};

/// `Si5351A` register addresses
mod reg {
    pub const DEVICE_STATUS: u8 = 0;
    pub const OUTPUT_ENABLE: u8 = 3;
    pub const CLK0_CONTROL: u8 = 16;
    pub const PLLA_PARAMS: u8 = 26;
    pub const MS0_PARAMS: u8 = 42;
    pub const PLL_RESET: u8 = 177;
    pub const CRYSTAL_LOAD: u8 = 183;
}

/// `SYS_INIT` bit of the status register
const STATUS_SYS_INIT: u8 = 0x80;

/// Status reads before giving up on `SYS_INIT`
const READY_POLLS: u32 = 1_000;

/// Control register: powered down
const CLK_POWER_DOWN: u8 = 0x80;

/// Control register: integer mode, PLL A, multisynth source (drive in bits 1:0)
const CLK_MS_INT_PLLA: u8 = 0x4C;

/// PLL reset register: reset PLL A
const RESET_PLLA: u8 = 0x20;

/// Driver failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Si5351Error<E> {
    /// I2C transaction failed
    Bus(E),
    /// Requested frequency is outside the synthesizer's range
    Unreachable,
}

impl<E: fmt::Debug> fmt::Display for Si5351Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "I2C error: {e:?}"),
            Self::Unreachable => write!(f, "frequency out of range"),
        }
    }
}

#[cfg(feature = "embedded")]
impl<E: fmt::Debug> defmt::Format for Si5351Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus(e) => defmt::write!(f, "I2C error: {}", defmt::Debug2Format(e)),
            Self::Unreachable => defmt::write!(f, "frequency out of range"),
        }
    }
}

const fn control_reg(output: ClockOutput) -> u8 {
    reg::CLK0_CONTROL + output.index()
}

const fn ms_reg(output: ClockOutput) -> u8 {
    reg::MS0_PARAMS + 8 * output.index()
}

/// `Si5351A` driver
pub struct Si5351<I> {
    bus: I2cBus<I>,
    address: I2cAddress,
    nominal_xtal_hz: u32,
    xtal_hz: u64,
    /// Shadow of the output enable register (set bit = disabled)
    output_enable: u8,
    drive: [DriveStrength; 3],
    /// Divisor currently programmed per output, None while powered down
    divisor: [Option<MsParams>; 3],
}

impl<I: I2c> Si5351<I> {
    /// Create a driver for the device at the default address
    #[must_use]
    pub const fn new(i2c: I) -> Self {
        Self {
            bus: I2cBus::new(i2c),
            address: I2cAddress::SI5351,
            nominal_xtal_hz: SI5351_XTAL_FREQ,
            xtal_hz: SI5351_XTAL_FREQ as u64,
            output_enable: 0xFF,
            drive: [DriveStrength::Drive8mA; 3],
            divisor: [None; 3],
        }
    }

    /// Crystal frequency in use after calibration
    #[must_use]
    pub const fn xtal_hz(&self) -> u64 {
        self.xtal_hz
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Si5351Error<I::Error>> {
        self.bus
            .write_reg(self.address, reg, value)
            .await
            .map_err(Si5351Error::Bus)
    }

    async fn write_regs(&mut self, reg: u8, values: &[u8]) -> Result<(), Si5351Error<I::Error>> {
        self.bus
            .write_regs(self.address, reg, values)
            .await
            .map_err(Si5351Error::Bus)
    }

    /// Wait for `SYS_INIT` to clear
    async fn wait_ready(&mut self) -> Result<(), Si5351Error<I::Error>> {
        for _ in 0..READY_POLLS {
            let status = self
                .bus
                .read_reg(self.address, reg::DEVICE_STATUS)
                .await
                .map_err(Si5351Error::Bus)?;
            if status & STATUS_SYS_INIT == 0 {
                return Ok(());
            }
        }
        // Carry on; the first frequency write will fail if it is really gone
        warn!("Si5351: device still initialising");
        Ok(())
    }

    async fn write_control(&mut self, output: ClockOutput) -> Result<(), Si5351Error<I::Error>> {
        let drive = self.drive[usize::from(output.index())];
        self.write_reg(control_reg(output), CLK_MS_INT_PLLA | drive.as_reg())
            .await
    }
}

impl<I: I2c> Synthesizer for Si5351<I> {
    type Error = Si5351Error<I::Error>;

    async fn init(&mut self, calibration: SynthCalibration) -> Result<(), Self::Error> {
        self.xtal_hz = calibration.corrected_xtal_hz(self.nominal_xtal_hz);

        self.wait_ready().await?;

        self.output_enable = 0xFF;
        self.write_reg(reg::OUTPUT_ENABLE, self.output_enable).await?;
        self.write_reg(reg::CRYSTAL_LOAD, calibration.load.as_reg())
            .await?;

        for output in ClockOutput::ALL {
            self.write_reg(control_reg(output), CLK_POWER_DOWN).await?;
        }
        self.divisor = [None; 3];

        debug!("Si5351: ready, reference {} Hz", self.xtal_hz);
        Ok(())
    }

    async fn set_drive_strength(
        &mut self,
        output: ClockOutput,
        drive: DriveStrength,
    ) -> Result<(), Self::Error> {
        self.drive[usize::from(output.index())] = drive;
        if self.divisor[usize::from(output.index())].is_some() {
            self.write_control(output).await?;
        }
        Ok(())
    }

    async fn set_frequency(&mut self, centihertz: u64, output: ClockOutput) -> Result<(), Self::Error> {
        let plan = plan_centihertz(self.xtal_hz, centihertz).ok_or(Si5351Error::Unreachable)?;
        let slot = usize::from(output.index());

        self.write_regs(reg::PLLA_PARAMS, &plan.pll.register_block())
            .await?;

        if self.divisor[slot] != Some(plan.ms) {
            self.write_regs(ms_reg(output), &plan.ms.register_block())
                .await?;
            self.write_control(output).await?;
            self.write_reg(reg::PLL_RESET, RESET_PLLA).await?;
            self.divisor[slot] = Some(plan.ms);
            trace!("Si5351: {} divisor {}", output, plan.ms.a);
        }
        Ok(())
    }

    async fn enable_output(&mut self, output: ClockOutput, enabled: bool) -> Result<(), Self::Error> {
        let bit = 1 << output.index();
        if enabled {
            self.output_enable &= !bit;
        } else {
            self.output_enable |= bit;
        }
        self.write_reg(reg::OUTPUT_ENABLE, self.output_enable).await
    }
}
