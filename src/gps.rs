//! GPS Feed
//!
//! Turns the receiver's NMEA byte stream into the [`GeoFix`] snapshot the
//! control core reads. Only `RMC` and `GGA` sentences are decoded; anything
//! else is counted and dropped.

use heapless::Vec;

use crate::config::{GPS_GRACE_MS, GPS_MIN_CHARS};
use crate::types::{GeoFix, UtcDate, UtcTime};

/// Longest sentence accepted (NMEA allows 82 characters)
pub const MAX_SENTENCE_LEN: usize = 96;

/// Source of the current fix
///
/// `drain` must not block: it consumes whatever bytes have already
/// arrived and returns.
pub trait FixSource {
    /// Consume pending bytes from the receiver
    fn drain(&mut self);

    /// Latest fix snapshot
    fn fix(&self) -> &GeoFix;
}

/// Sentence types the parser understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentence {
    /// Recommended minimum data (time, date, position, status)
    Rmc,
    /// Fix data (time, position, quality, satellites)
    Gga,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Sentence {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rmc => defmt::write!(f, "RMC"),
            Self::Gga => defmt::write!(f, "GGA"),
        }
    }
}

/// Incremental NMEA 0183 parser
pub struct NmeaParser {
    /// Sentence buffer, without the leading `$`
    buffer: Vec<u8, MAX_SENTENCE_LEN>,
    /// Inside a sentence
    collecting: bool,
    fix: GeoFix,
    /// Sentences dropped for a bad checksum or format
    rejected: u32,
}

impl NmeaParser {
    /// Create a parser with an empty fix
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            collecting: false,
            fix: GeoFix {
                latitude: 0.0,
                longitude: 0.0,
                valid: false,
                time: UtcTime::new(0, 0, 0),
                date: UtcDate::new(0, 0, 0),
                satellites: 0,
                chars_processed: 0,
            },
            rejected: 0,
        }
    }

    /// Current fix
    #[must_use]
    pub const fn fix(&self) -> &GeoFix {
        &self.fix
    }

    /// Number of sentences rejected so far
    #[must_use]
    pub const fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Discard a partially received sentence
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.collecting = false;
    }

    /// Feed one byte from the receiver
    /// Returns the sentence type when a sentence was decoded into the fix
    pub fn feed(&mut self, byte: u8) -> Option<Sentence> {
        self.fix.chars_processed = self.fix.chars_processed.wrapping_add(1);

        match byte {
            b'$' => {
                self.buffer.clear();
                self.collecting = true;
                None
            }
            b'\r' | b'\n' => {
                if !self.collecting {
                    return None;
                }
                self.collecting = false;
                let sentence = self.parse_buffer();
                if sentence.is_none() {
                    self.rejected = self.rejected.wrapping_add(1);
                }
                self.buffer.clear();
                sentence
            }
            _ => {
                if self.collecting && self.buffer.push(byte).is_err() {
                    // Overlong line
                    self.collecting = false;
                    self.buffer.clear();
                    self.rejected = self.rejected.wrapping_add(1);
                }
                None
            }
        }
    }

    fn parse_buffer(&mut self) -> Option<Sentence> {
        let star = self.buffer.iter().position(|&b| b == b'*')?;
        let (body, tail) = self.buffer.split_at(star);
        let expected = parse_hex_byte(tail.get(1..3)?)?;
        if !body.is_ascii() || nmea_checksum(body) != expected {
            return None;
        }

        let body = core::str::from_utf8(body).ok()?;
        let mut fields = body.split(',');
        let address = fields.next()?;
        if address.len() != 5 {
            return None;
        }

        // Any talker (GP, GN, GL, ...)
        match &address[2..] {
            "RMC" => apply_rmc(&mut self.fix, fields).map(|()| Sentence::Rmc),
            "GGA" => apply_gga(&mut self.fix, fields).map(|()| Sentence::Gga),
            _ => None,
        }
    }
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

/// XOR of every byte between `$` and `*`
#[must_use]
pub fn nmea_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, &b| acc ^ b)
}

fn parse_hex_byte(digits: &[u8]) -> Option<u8> {
    let text = core::str::from_utf8(digits).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// `hhmmss(.ss)`
fn parse_time(field: &str) -> Option<UtcTime> {
    if field.len() < 6 {
        return None;
    }
    Some(UtcTime::new(
        field[0..2].parse().ok()?,
        field[2..4].parse().ok()?,
        field[4..6].parse().ok()?,
    ))
}

/// `ddmmyy`, years counted from 2000
fn parse_date(field: &str) -> Option<UtcDate> {
    if field.len() != 6 {
        return None;
    }
    let yy: u16 = field[4..6].parse().ok()?;
    Some(UtcDate::new(
        2000 + yy,
        field[2..4].parse().ok()?,
        field[0..2].parse().ok()?,
    ))
}

/// `(d)ddmm.mmmm` plus hemisphere into signed degrees
fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f32> {
    if value.len() <= degree_digits {
        return None;
    }
    let degrees: f32 = value[..degree_digits].parse().ok()?;
    let minutes: f32 = value[degree_digits..].parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(magnitude),
        "S" | "W" => Some(-magnitude),
        _ => None,
    }
}

fn parse_position<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Option<(f32, f32)> {
    let lat = fields.next()?;
    let ns = fields.next()?;
    let lon = fields.next()?;
    let ew = fields.next()?;
    Some((
        parse_coordinate(lat, ns, 2)?,
        parse_coordinate(lon, ew, 3)?,
    ))
}

/// `hhmmss,A,lat,N,lon,E,speed,course,ddmmyy,...`
fn apply_rmc<'a>(fix: &mut GeoFix, mut fields: impl Iterator<Item = &'a str>) -> Option<()> {
    let time = fields.next()?;
    let status = fields.next()?;
    let position = parse_position(&mut fields);
    let _speed = fields.next()?;
    let _course = fields.next()?;
    let date = fields.next()?;

    if let Some(time) = parse_time(time) {
        fix.time = time;
    }
    if let Some(date) = parse_date(date) {
        fix.date = date;
    }

    fix.valid = status == "A" && position.is_some();
    if let (true, Some((lat, lon))) = (fix.valid, position) {
        fix.latitude = lat;
        fix.longitude = lon;
    }
    Some(())
}

/// `hhmmss,lat,N,lon,E,quality,satellites,...`
fn apply_gga<'a>(fix: &mut GeoFix, mut fields: impl Iterator<Item = &'a str>) -> Option<()> {
    let time = fields.next()?;
    let position = parse_position(&mut fields);
    let quality: u8 = fields.next()?.parse().unwrap_or(0);
    let satellites = fields.next()?;

    if let Some(time) = parse_time(time) {
        fix.time = time;
    }
    fix.satellites = satellites.parse().unwrap_or(0);

    fix.valid = quality > 0 && position.is_some();
    if let (true, Some((lat, lon))) = (fix.valid, position) {
        fix.latitude = lat;
        fix.longitude = lon;
    }
    Some(())
}

/// GPS receiver on a byte stream
pub struct GpsReceiver<R> {
    uart: R,
    parser: NmeaParser,
    had_fix: bool,
}

impl<R> GpsReceiver<R>
where
    R: embedded_io::Read + embedded_io::ReadReady,
{
    /// Wrap a receive stream
    pub const fn new(uart: R) -> Self {
        Self {
            uart,
            parser: NmeaParser::new(),
            had_fix: false,
        }
    }

    /// Parser state, for diagnostics
    #[must_use]
    pub const fn parser(&self) -> &NmeaParser {
        &self.parser
    }
}

impl<R> FixSource for GpsReceiver<R>
where
    R: embedded_io::Read + embedded_io::ReadReady,
{
    fn drain(&mut self) {
        let mut chunk = [0u8; 32];
        loop {
            match self.uart.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    warn!("GPS: UART read error");
                    break;
                }
            }
            let n = match self.uart.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => {
                    warn!("GPS: UART read error");
                    break;
                }
            };
            for &byte in &chunk[..n] {
                if let Some(sentence) = self.parser.feed(byte) {
                    trace!("GPS: {}", sentence);
                }
            }
        }

        let valid = self.parser.fix().valid;
        if valid != self.had_fix {
            self.had_fix = valid;
            if valid {
                info!("GPS: fix acquired ({} satellites)", self.parser.fix().satellites);
            } else {
                info!("GPS: fix lost");
            }
        }
    }

    fn fix(&self) -> &GeoFix {
        self.parser.fix()
    }
}

/// Flags a receiver that has been silent past the startup grace period
#[derive(Clone, Copy, Debug)]
pub struct GpsWatchdog {
    last_check_ms: u64,
}

impl GpsWatchdog {
    /// Start the grace period at `now_ms`
    #[must_use]
    pub const fn new(now_ms: u64) -> Self {
        Self {
            last_check_ms: now_ms,
        }
    }

    /// Returns true (and logs) when a grace period has passed since the
    /// last warning and fewer than `GPS_MIN_CHARS` bytes have arrived
    pub fn check(&mut self, now_ms: u64, chars_processed: u32) -> bool {
        if now_ms.saturating_sub(self.last_check_ms) < GPS_GRACE_MS {
            return false;
        }
        self.last_check_ms = now_ms;
        if chars_processed < GPS_MIN_CHARS {
            warn!("No GPS data received: check wiring");
            true
        } else {
            false
        }
    }
}
