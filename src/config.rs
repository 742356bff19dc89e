//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the beacon hardware and
//! the transmission parameters. Pin mappings, timing and the band plan are
//! centralized here.

use crate::synth::{ClockOutput, CrystalLoad, DriveStrength};
use crate::types::{Frequency, PowerDbm};

/// Station callsign sent in every transmission (replace with your own)
pub const CALLSIGN: &str = "K1ABC";

/// Reported transmit power in dBm (must end in 0, 3 or 7)
pub const POWER_DBM: u8 = 23;

/// Band plan: WSPR dial frequencies in Hz, cycled by a long button press
pub const BAND_FREQUENCIES_HZ: [u32; 5] = [
    7_038_600,  // 40m
    10_138_700, // 30m
    14_095_600, // 20m
    18_104_600, // 17m
    21_094_600, // 15m
];

/// Capacity of the band list
pub const MAX_BANDS: usize = 8;

/// Band selected at power-up (index into `BAND_FREQUENCIES_HZ`)
pub const DEFAULT_BAND_INDEX: usize = 2;

/// Audio offset above the dial frequency in Hz (centre of the 200 Hz sub-band)
pub const AUDIO_OFFSET_HZ: u32 = 1_500;

/// Spacing between adjacent tones in centihertz (12000/8192 Hz)
pub const TONE_SPACING_CENTIHZ: u32 = 146;

/// Symbol hold time in milliseconds (8192/12000 s)
pub const SYMBOL_PERIOD_MS: u32 = 683;

/// Number of symbols in one transmission
pub const WSPR_SYMBOL_COUNT: usize = 162;

/// Locator reported until the first valid fix
pub const DEFAULT_LOCATOR: &str = "AA00";

/// Press duration at or above which a press counts as long (ms)
pub const LONG_PRESS_MS: u32 = 500;

/// Hold duration after which the button is considered stuck (ms)
pub const BUTTON_MAX_HOLD_MS: u32 = 10_000;

/// Button polling interval while measuring a press (ms); one tick so the
/// long-press threshold is resolved to the millisecond
pub const BUTTON_POLL_MS: u32 = 1;

/// Control cycle period (ms)
pub const CYCLE_PERIOD_MS: u32 = 200;

/// Pause after a scheduled transmission (ms)
pub const POST_TX_PAUSE_MS: u32 = 1_000;

/// Pause between back-to-back forced transmissions (ms)
pub const FORCED_TX_PAUSE_MS: u32 = 1_000;

/// Longest wait without draining the GPS UART (ms)
pub const GPS_DRAIN_SLICE_MS: u32 = 10;

/// Startup grace period before warning about a silent receiver (ms)
pub const GPS_GRACE_MS: u64 = 5_000;

/// Fewer characters than this after the grace period means no GPS data
pub const GPS_MIN_CHARS: u32 = 10;

/// GPS UART baud rate
pub const GPS_BAUD_RATE: u32 = 9_600;

/// GPS UART receive buffer size in bytes
pub const GPS_RX_BUFFER_SIZE: usize = 256;

/// GPS UART transmit buffer size in bytes
pub const GPS_TX_BUFFER_SIZE: usize = 16;

/// Trusted GPS year window (exclusive bounds)
pub const YEAR_MIN_EXCLUSIVE: u16 = 2000;

/// Trusted GPS year window (exclusive bounds)
pub const YEAR_MAX_EXCLUSIVE: u16 = 2080;

/// Transmission slot length in minutes
pub const SLOT_MINUTES: u8 = 2;

/// Latest second within the slot's first minute that still starts a transmission
pub const SLOT_WINDOW_SECONDS: u8 = 1;

/// Band change acknowledgement: LED on time per blink (ms)
pub const BAND_BLINK_ON_MS: u32 = 150;

/// Band change acknowledgement: LED off time per blink (ms)
pub const BAND_BLINK_OFF_MS: u32 = 250;

/// I2C bus frequency for the `Si5351A`
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// `Si5351A` I2C address
pub const SI5351_I2C_ADDR: u8 = 0x60;

/// `Si5351A` crystal frequency (25 MHz standard)
pub const SI5351_XTAL_FREQ: u32 = 25_000_000;

/// `Si5351A` crystal load capacitance
pub const SI5351_CRYSTAL_LOAD: CrystalLoad = CrystalLoad::Load8pF;

/// Measured crystal error in parts per billion
pub const SI5351_CORRECTION_PPB: i32 = 0;

/// Measured reference offset in Hz
pub const SI5351_REFERENCE_OFFSET_HZ: i32 = 0;

/// Clock output wired to the transmitter
pub const TX_OUTPUT: ClockOutput = ClockOutput::Clk0;

/// Drive strength for the transmitter output
pub const TX_DRIVE: DriveStrength = DriveStrength::Drive8mA;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Fix-acquired indicator (green)
    pub const LED_FIX: &str = "PA5";

    /// Time-valid / liveness indicator (blue)
    pub const LED_TIME: &str = "PB0";

    /// Transmit indicator (red)
    pub const LED_TX: &str = "PB1";

    /// Operator button (active low, internal pull-up)
    pub const BUTTON: &str = "PB4";

    /// I2C1 SCL (Si5351)
    pub const I2C1_SCL: &str = "PB8";

    /// I2C1 SDA (Si5351)
    pub const I2C1_SDA: &str = "PB9";

    /// USART1 RX from the GPS module
    pub const GPS_RX: &str = "PA10";

    /// USART1 TX to the GPS module (unused, required by the driver)
    pub const GPS_TX: &str = "PA9";
}

/// Immutable transmission parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransmissionConfig {
    /// Station callsign
    pub callsign: &'static str,
    /// Reported power
    pub power: PowerDbm,
    /// Audio offset above the dial frequency (Hz)
    pub audio_offset_hz: u32,
    /// Tone spacing (centihertz)
    pub tone_spacing_centihz: u32,
    /// Per-symbol hold time (ms)
    pub symbol_period_ms: u32,
    /// Symbols per transmission
    pub symbol_count: usize,
}

impl TransmissionConfig {
    /// Build the configuration from the constants above
    ///
    /// Returns None if `POWER_DBM` is not a reportable level.
    #[must_use]
    pub const fn beacon() -> Option<Self> {
        match PowerDbm::new(POWER_DBM) {
            Some(power) => Some(Self {
                callsign: CALLSIGN,
                power,
                audio_offset_hz: AUDIO_OFFSET_HZ,
                tone_spacing_centihz: TONE_SPACING_CENTIHZ,
                symbol_period_ms: SYMBOL_PERIOD_MS,
                symbol_count: WSPR_SYMBOL_COUNT,
            }),
            None => None,
        }
    }

    /// Total on-air time of one transmission in milliseconds
    #[must_use]
    pub const fn transmission_ms(&self) -> u64 {
        self.symbol_period_ms as u64 * self.symbol_count as u64
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransmissionConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Tx({=str}, {}, +{}Hz, {}ms x {})",
            self.callsign,
            self.power,
            self.audio_offset_hz,
            self.symbol_period_ms,
            self.symbol_count
        );
    }
}

/// Synthesizer calibration applied at initialisation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthCalibration {
    /// Crystal load capacitance
    pub load: CrystalLoad,
    /// Offset of the reference from its nominal frequency (Hz)
    pub reference_offset_hz: i32,
    /// Crystal frequency correction (parts per billion)
    pub correction_ppb: i32,
}

impl SynthCalibration {
    /// Calibration from the constants above
    #[must_use]
    pub const fn beacon() -> Self {
        Self {
            load: SI5351_CRYSTAL_LOAD,
            reference_offset_hz: SI5351_REFERENCE_OFFSET_HZ,
            correction_ppb: SI5351_CORRECTION_PPB,
        }
    }

    /// Apply the calibration to a nominal crystal frequency
    #[must_use]
    pub const fn corrected_xtal_hz(&self, nominal_hz: u32) -> u64 {
        let base = nominal_hz as i64 + self.reference_offset_hz as i64;
        let corrected = base + base * self.correction_ppb as i64 / 1_000_000_000;
        if corrected < 0 {
            0
        } else {
            corrected as u64
        }
    }
}

impl Default for SynthCalibration {
    fn default() -> Self {
        Self::beacon()
    }
}

/// Build the band list from `BAND_FREQUENCIES_HZ`
///
/// Entries outside the synthesizer range are skipped.
#[must_use]
pub fn band_plan() -> heapless::Vec<Frequency, MAX_BANDS> {
    BAND_FREQUENCIES_HZ
        .iter()
        .filter_map(|&hz| Frequency::from_hz(hz))
        .collect()
}
