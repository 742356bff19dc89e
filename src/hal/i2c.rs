//! I2C Bus Abstractions
//!
//! Register-oriented access to I2C peripherals such as the `Si5351A`.
//! Generic over any `embedded-hal-async` bus, so the same code runs on the
//! embassy DMA driver and against a mock in host tests.

use embedded_hal_async::i2c::I2c;

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// `Si5351A` clock synthesizer address
    pub const SI5351: Self = Self(crate::config::SI5351_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{=u8:x}", self.0);
    }
}

/// Longest burst `write_regs` sends as one transaction
const MAX_BURST: usize = 16;

/// I2C bus wrapper with register helpers
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    /// Wrap a bus
    #[must_use]
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Write a single register
    pub async fn write_reg(&mut self, addr: I2cAddress, reg: u8, value: u8) -> Result<(), I::Error> {
        self.i2c.write(addr.addr(), &[reg, value]).await
    }

    /// Read a single register
    pub async fn read_reg(&mut self, addr: I2cAddress, reg: u8) -> Result<u8, I::Error> {
        let mut buf = [0u8];
        self.i2c.write_read(addr.addr(), &[reg], &mut buf).await?;
        Ok(buf[0])
    }

    /// Write consecutive registers starting at `base_reg`
    pub async fn write_regs(
        &mut self,
        addr: I2cAddress,
        base_reg: u8,
        values: &[u8],
    ) -> Result<(), I::Error> {
        if values.len() <= MAX_BURST {
            let mut buf = [0u8; MAX_BURST + 1];
            buf[0] = base_reg;
            buf[1..=values.len()].copy_from_slice(values);
            self.i2c.write(addr.addr(), &buf[..=values.len()]).await
        } else {
            for (i, &value) in values.iter().enumerate() {
                self.write_reg(addr, base_reg.wrapping_add(i as u8), value).await?;
            }
            Ok(())
        }
    }
}
