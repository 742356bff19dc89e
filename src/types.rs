//! Shared types used across the beacon firmware
//!
//! Domain newtypes that enforce their invariants on construction, plus the
//! read-only GPS fix snapshot the control core works from.

use core::fmt;

/// Carrier frequency in Hertz with validation
///
/// Represents a frequency the `Si5351A` can produce on a clock output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Minimum synthesizer output (8 kHz)
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum synthesizer output (160 MHz)
    pub const MAX_HZ: u32 = 160_000_000;

    /// Create a new Frequency from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz))
        } else {
            None
        }
    }

    /// Create a new Frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Option<Self> {
        match khz.checked_mul(1000) {
            Some(hz) => Self::from_hz(hz),
            None => None,
        }
    }

    /// Get the frequency in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Get the frequency in hundredths of a Hertz, the synthesizer's unit
    #[must_use]
    pub const fn as_centihertz(self) -> u64 {
        self.0 as u64 * 100
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} Hz)", self.0)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06} MHz", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} kHz", self.0 / 1000);
    }
}

/// Transmit power as reported in the beacon message (dBm)
///
/// The message format only carries levels between 0 and 60 dBm whose last
/// digit is 0, 3 or 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PowerDbm(u8);

impl PowerDbm {
    /// Highest reportable level
    pub const MAX: Self = Self(60);

    /// Create a power level, returns None if it cannot be reported
    #[must_use]
    pub const fn new(dbm: u8) -> Option<Self> {
        if dbm <= 60 && matches!(dbm % 10, 0 | 3 | 7) {
            Some(Self(dbm))
        } else {
            None
        }
    }

    /// Get the level in dBm
    #[must_use]
    pub const fn as_dbm(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PowerDbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dBm", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerDbm {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} dBm", self.0);
    }
}

/// UTC time of day from the GPS receiver
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UtcTime {
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59, 60 on a leap second)
    pub second: u8,
}

impl UtcTime {
    /// Create a time of day
    #[must_use]
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for UtcTime {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{}:{}:{}Z",
            self.hour,
            self.minute,
            self.second
        );
    }
}

/// UTC calendar date from the GPS receiver
///
/// `year` is 0 until the receiver has reported a date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UtcDate {
    /// Full year (e.g. 2024)
    pub year: u16,
    /// Month (1-12)
    pub month: u8,
    /// Day of month (1-31)
    pub day: u8,
}

impl UtcDate {
    /// Create a date
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for UtcDate {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}-{}-{}", self.year, self.month, self.day);
    }
}

/// Snapshot of the GPS receiver's current solution
///
/// Produced by the GPS feed and only ever read by the control core.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoFix {
    /// Latitude in degrees, north positive
    pub latitude: f32,
    /// Longitude in degrees, east positive
    pub longitude: f32,
    /// Position is from a current, valid solution
    pub valid: bool,
    /// Time of day
    pub time: UtcTime,
    /// Calendar date
    pub date: UtcDate,
    /// Satellites used in the solution
    pub satellites: u8,
    /// Total bytes received from the receiver
    pub chars_processed: u32,
}

impl GeoFix {
    /// A fix with a valid position and the given time, used by tests and
    /// simulations
    #[must_use]
    pub const fn at(latitude: f32, longitude: f32, date: UtcDate, time: UtcTime) -> Self {
        Self {
            latitude,
            longitude,
            valid: true,
            time,
            date,
            satellites: 0,
            chars_processed: 0,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for GeoFix {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Fix(valid={}, {} {}, sats={})",
            self.valid,
            self.date,
            self.time,
            self.satellites
        );
    }
}
