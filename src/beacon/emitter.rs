//! Symbol Emitter
//!
//! Keys the synthesizer through a symbol sequence. Each symbol is held
//! until an absolute deadline measured from the start of the sequence, so
//! per-symbol scheduling latency does not add up over a transmission.

use crate::config::{TransmissionConfig, TX_DRIVE, TX_OUTPUT};
use crate::synth::{ClockOutput, DriveStrength, Synthesizer};
use crate::timing::Clock;
use crate::types::Frequency;

/// Summary of a completed emission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmitReport {
    /// Symbols sent
    pub symbols: usize,
    /// Time from the first frequency write to the end of the last hold
    pub elapsed_ms: u64,
}

/// Drives one output of a synthesizer through symbol sequences
#[derive(Clone, Copy, Debug)]
pub struct SymbolEmitter {
    output: ClockOutput,
    drive: DriveStrength,
    audio_offset_hz: u32,
    tone_spacing_centihz: u32,
    symbol_period_ms: u32,
}

impl SymbolEmitter {
    /// Emitter for the configured transmit output
    #[must_use]
    pub const fn new(config: &TransmissionConfig) -> Self {
        Self::with_output(config, TX_OUTPUT, TX_DRIVE)
    }

    /// Emitter for a specific output and drive strength
    #[must_use]
    pub const fn with_output(
        config: &TransmissionConfig,
        output: ClockOutput,
        drive: DriveStrength,
    ) -> Self {
        Self {
            output,
            drive,
            audio_offset_hz: config.audio_offset_hz,
            tone_spacing_centihz: config.tone_spacing_centihz,
            symbol_period_ms: config.symbol_period_ms,
        }
    }

    /// Output frequency of tone 0 for a dial frequency, in centihertz
    #[must_use]
    pub const fn base_centihertz(&self, carrier: Frequency) -> u64 {
        carrier.as_centihertz() + self.audio_offset_hz as u64 * 100
    }

    /// Output frequency of a tone, in centihertz
    #[must_use]
    pub const fn tone_centihertz(&self, carrier: Frequency, symbol: u8) -> u64 {
        self.base_centihertz(carrier) + symbol as u64 * self.tone_spacing_centihz as u64
    }

    /// Send every symbol, holding each for the symbol period
    ///
    /// The output is disabled before the first symbol and after the last
    /// one, including when a synthesizer call fails part way.
    pub async fn emit<S, C>(
        &self,
        synth: &mut S,
        clock: &mut C,
        symbols: &[u8],
        carrier: Frequency,
    ) -> Result<EmitReport, S::Error>
    where
        S: Synthesizer,
        C: Clock,
    {
        synth.enable_output(self.output, false).await?;
        synth.set_drive_strength(self.output, self.drive).await?;

        let result = self.key_symbols(synth, clock, symbols, carrier).await;
        let disabled = synth.enable_output(self.output, false).await;

        let elapsed_ms = result?;
        disabled?;
        Ok(EmitReport {
            symbols: symbols.len(),
            elapsed_ms,
        })
    }

    async fn key_symbols<S, C>(
        &self,
        synth: &mut S,
        clock: &mut C,
        symbols: &[u8],
        carrier: Frequency,
    ) -> Result<u64, S::Error>
    where
        S: Synthesizer,
        C: Clock,
    {
        let period = u64::from(self.symbol_period_ms);
        let start = clock.now_ms();

        for (i, &symbol) in symbols.iter().enumerate() {
            synth
                .set_frequency(self.tone_centihertz(carrier, symbol), self.output)
                .await?;
            if i == 0 {
                synth.enable_output(self.output, true).await?;
            }
            clock.delay_until_ms(start + (i as u64 + 1) * period).await;
        }

        Ok(clock.now_ms() - start)
    }
}
