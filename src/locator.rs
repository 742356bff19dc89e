//! Maidenhead Grid Locator
//!
//! Converts a position into the 4-character grid square the beacon reports
//! (`JJ00`), with the 6-character subsquare form (`JJ00aa`) available for
//! display and logging.
//!
//! Preconditions: latitude in [-90, 90], longitude in [-180, 180]. The
//! north pole and the antimeridian edge are folded into the last field so
//! the result is always well formed.

use core::fmt;
#[cfg(feature = "embedded")]
use micromath::F32Ext;

use heapless::String;

use crate::config::DEFAULT_LOCATOR;

/// Fields per axis (A-R)
const FIELDS: f32 = 18.0;
/// Subsquares per square (a-x)
const SUBSQUARES: f32 = 24.0;

/// A 4-character grid locator: two field letters then two square digits
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Locator(String<4>);

impl Locator {
    /// Parse a locator, accepting only `[A-R][A-R][0-9][0-9]`
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 4
            || !(b'A'..=b'R').contains(&bytes[0])
            || !(b'A'..=b'R').contains(&bytes[1])
            || !bytes[2].is_ascii_digit()
            || !bytes[3].is_ascii_digit()
        {
            return None;
        }
        let mut s = String::new();
        s.push_str(text).ok()?;
        Some(Self(s))
    }

    /// The locator text
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The locator characters as bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for Locator {
    /// The first square of the grid, `AA00`
    fn default() -> Self {
        let mut s = String::new();
        let _ = s.push_str(DEFAULT_LOCATOR);
        Self(s)
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({})", self.0)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Locator {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.0.as_str());
    }
}

/// Grid cell indices for one axis
#[derive(Clone, Copy, Debug)]
struct AxisCells {
    field: u8,
    square: u8,
    subsquare: u8,
}

/// Split an axis offset (degrees from the grid origin) into cells
///
/// `field_span` is 20° for longitude and 10° for latitude; squares are a
/// tenth of a field and subsquares a twenty-fourth of a square.
fn axis_cells(offset: f32, field_span: f32) -> AxisCells {
    let field = (offset / field_span).floor().clamp(0.0, FIELDS - 1.0);
    let in_field = offset - field * field_span;

    let square_span = field_span / 10.0;
    let square = (in_field / square_span).floor().clamp(0.0, 9.0);
    let in_square = in_field - square * square_span;

    let subsquare = (in_square / square_span * SUBSQUARES)
        .floor()
        .clamp(0.0, SUBSQUARES - 1.0);

    AxisCells {
        field: field as u8,
        square: square as u8,
        subsquare: subsquare as u8,
    }
}

fn cells(latitude: f32, longitude: f32) -> (AxisCells, AxisCells) {
    (
        axis_cells(longitude + 180.0, 20.0),
        axis_cells(latitude + 90.0, 10.0),
    )
}

/// Compute the 4-character locator for a position
#[must_use]
pub fn compute_locator(latitude: f32, longitude: f32) -> Locator {
    let (lon, lat) = cells(latitude, longitude);

    let mut s = String::new();
    for c in [
        char::from(b'A' + lon.field),
        char::from(b'A' + lat.field),
        char::from(b'0' + lon.square),
        char::from(b'0' + lat.square),
    ] {
        let _ = s.push(c);
    }
    Locator(s)
}

/// Compute the 6-character locator (square plus lowercase subsquare)
///
/// Only the 4-character form goes on air.
#[must_use]
pub fn compute_locator_extended(latitude: f32, longitude: f32) -> String<6> {
    let (lon, lat) = cells(latitude, longitude);

    let mut s = String::new();
    let _ = s.push_str(compute_locator(latitude, longitude).as_str());
    let _ = s.push(char::from(b'a' + lon.subsquare));
    let _ = s.push(char::from(b'a' + lat.subsquare));
    s
}
