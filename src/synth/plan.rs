//! Si5351 Frequency Planning
//!
//! Computes PLL and multisynth divider settings for an output frequency
//! given in centihertz. Pure integer arithmetic, testable on the host.
//!
//! # Theory of Operation
//!
//! The Si5351 uses a two-stage frequency synthesis:
//! 1. PLL stage: FVCO = FXTAL × (a + b/c) where 15 ≤ a ≤ 90
//! 2. Multisynth stage: FOUT = FVCO / (d + e/f) / R where 4 ≤ d ≤ 1800
//!
//! The multisynth is held at an even integer divisor and all fine tuning
//! happens in the PLL fraction. Consecutive tones on one band then share a
//! divisor, so stepping between them only rewrites the PLL numerator.

/// PLL parameters for frequency calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllParams {
    /// Integer part (15-90)
    pub a: u32,
    /// Numerator (0 to c-1)
    pub b: u32,
    /// Denominator (1-1048575)
    pub c: u32,
}

impl PllParams {
    /// Minimum PLL multiplier
    pub const MIN_A: u32 = 15;
    /// Maximum PLL multiplier
    pub const MAX_A: u32 = 90;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer PLL params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self { a, b: 0, c: 1 }
    }

    /// Create fractional PLL params
    #[must_use]
    pub const fn fractional(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c }
    }

    /// VCO frequency in centihertz for a reference in centihertz
    #[must_use]
    pub fn vco_centihertz(&self, xtal_centihz: u64) -> u64 {
        // FVCO = FXTAL × (a·c + b) / c
        let num = u128::from(xtal_centihz) * (u128::from(self.a) * u128::from(self.c) + u128::from(self.b));
        (num / u128::from(self.c)) as u64
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.a >= Self::MIN_A
            && self.a <= Self::MAX_A
            && self.c >= 1
            && self.c <= Self::MAX_C
            && self.b < self.c
    }

    /// Calculate P1, P2, P3 register values for Si5351
    #[must_use]
    pub fn to_registers(&self) -> (u32, u32, u32) {
        // P1 = 128 × a + floor(128 × b/c) - 512
        // P2 = 128 × b - c × floor(128 × b/c)
        // P3 = c
        let floor_128b_c = ((128 * u64::from(self.b)) / u64::from(self.c)) as u32;
        let p1 = 128 * self.a + floor_128b_c - 512;
        let p2 = 128 * self.b - self.c * floor_128b_c;
        (p1, p2, self.c)
    }

    /// Register block for PLLx (8 bytes starting at register 26 or 34)
    #[must_use]
    pub fn register_block(&self) -> [u8; 8] {
        let (p1, p2, p3) = self.to_registers();
        pack_registers(p1, p2, p3, 0)
    }
}

/// Multisynth divider parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsParams {
    /// Integer part (4, 6-1800)
    pub a: u32,
    /// Numerator
    pub b: u32,
    /// Denominator
    pub c: u32,
    /// R divider power of 2 (0-7 for 1, 2, 4, 8, 16, 32, 64, 128)
    pub r_div: u8,
}

impl MsParams {
    /// Minimum integer divisor
    pub const MIN_A: u32 = 4;
    /// Maximum integer divisor
    pub const MAX_A: u32 = 1800;

    /// Create integer multisynth params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self::integer_with_r(a, 0)
    }

    /// Create integer multisynth with R divider
    #[must_use]
    pub const fn integer_with_r(a: u32, r_div: u8) -> Self {
        Self {
            a,
            b: 0,
            c: 1,
            r_div,
        }
    }

    /// Output frequency in centihertz for a VCO frequency in centihertz
    #[must_use]
    pub fn output_centihertz(&self, vco_centihz: u64) -> u64 {
        // FOUT = FVCO × c / (a·c + b) / R
        let divisor = u128::from(self.a) * u128::from(self.c) + u128::from(self.b);
        let out = u128::from(vco_centihz) * u128::from(self.c) / divisor;
        (out >> self.r_div) as u64
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        // Note: a=5 is not allowed
        let a_valid = self.a == 4 || (self.a >= 6 && self.a <= Self::MAX_A);
        let c_valid = self.c >= 1 && self.c <= PllParams::MAX_C;
        a_valid && c_valid && self.b < self.c && self.r_div <= 7
    }

    /// Check if this is an even integer divisor
    #[must_use]
    pub const fn is_even_integer(&self) -> bool {
        self.b == 0 && self.a % 2 == 0
    }

    /// Calculate P1, P2, P3 register values
    #[must_use]
    pub fn to_registers(&self) -> (u32, u32, u32) {
        if self.a == 4 {
            // Divide-by-4 mode ignores P1..P3
            return (0, 0, 1);
        }
        let floor_128b_c = ((128 * u64::from(self.b)) / u64::from(self.c)) as u32;
        let p1 = 128 * self.a + floor_128b_c - 512;
        let p2 = 128 * self.b - self.c * floor_128b_c;
        (p1, p2, self.c)
    }

    /// Register block for MSx (8 bytes starting at register 42, 50 or 58)
    #[must_use]
    pub fn register_block(&self) -> [u8; 8] {
        let (p1, p2, p3) = self.to_registers();
        let mut regs = pack_registers(p1, p2, p3, self.r_div);
        if self.a == 4 {
            regs[2] |= 0x0C; // MSx_DIVBY4
        }
        regs
    }
}

/// Complete synthesis settings for one output frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthPlan {
    /// PLL multiplier
    pub pll: PllParams,
    /// Output divider
    pub ms: MsParams,
    /// Frequency actually produced (centihertz)
    pub actual_centihz: u64,
    /// Actual minus requested (centihertz)
    pub error_centihz: i64,
}

/// Minimum VCO frequency (600 MHz)
pub const VCO_MIN_HZ: u64 = 600_000_000;
/// Maximum VCO frequency (900 MHz)
pub const VCO_MAX_HZ: u64 = 900_000_000;

/// Default crystal frequency (25 MHz)
pub const DEFAULT_XTAL_HZ: u64 = 25_000_000;

/// Plan the synthesizer settings for a target frequency in centihertz
///
/// Returns None when no divider combination reaches the target (above
/// roughly 150 MHz, or a reference too far off for the PLL range).
#[must_use]
pub fn plan_centihertz(xtal_hz: u64, target_centihz: u64) -> Option<SynthPlan> {
    if target_centihz == 0 || xtal_hz == 0 {
        return None;
    }

    let xtal_centihz = xtal_hz * 100;
    let vco_min = VCO_MIN_HZ * 100;
    let vco_max = VCO_MAX_HZ * 100;

    // Low outputs need the R divider to keep the multisynth in range
    for r_div in 0u8..=7 {
        let effective = target_centihz << r_div;

        // Largest even divisor that keeps the VCO at or below its maximum
        let ms_a = (vco_max / effective) & !1;
        if ms_a > u64::from(MsParams::MAX_A) {
            continue;
        }
        if ms_a < u64::from(MsParams::MIN_A) {
            return None;
        }

        let vco = effective * ms_a;
        if vco < vco_min {
            return None;
        }

        let pll = pll_for_vco(xtal_centihz, vco)?;
        let ms = MsParams::integer_with_r(ms_a as u32, r_div);
        let actual_centihz = ms.output_centihertz(pll.vco_centihertz(xtal_centihz));

        return Some(SynthPlan {
            pll,
            ms,
            actual_centihz,
            error_centihz: actual_centihz as i64 - target_centihz as i64,
        });
    }

    None
}

/// PLL parameters reaching `vco_centihz` from the reference
fn pll_for_vco(xtal_centihz: u64, vco_centihz: u64) -> Option<PllParams> {
    let mut a = vco_centihz / xtal_centihz;
    let remainder = vco_centihz % xtal_centihz;

    let (mut b, mut c) = best_fraction(remainder, xtal_centihz, u64::from(PllParams::MAX_C));
    if b >= c {
        // Fraction rounded up to a whole step
        a += 1;
        b = 0;
        c = 1;
    }

    if a < u64::from(PllParams::MIN_A) || a > u64::from(PllParams::MAX_A) {
        return None;
    }

    Some(PllParams::fractional(a as u32, b, c))
}

/// Best rational approximation b/c of num/den with c ≤ `max_den`
///
/// Walks the continued fraction of num/den and finishes with the best
/// semiconvergent, so the result is the closest fraction with a bounded
/// denominator. Requires `num < den`.
#[must_use]
pub fn best_fraction(num: u64, den: u64, max_den: u64) -> (u32, u32) {
    if num == 0 || den == 0 || max_den == 0 {
        return (0, 1);
    }

    // Convergents h(k-1)/k(k-1) and h(k)/k(k)
    let (mut p0, mut q0, mut p1, mut q1) = (0u64, 1u64, 1u64, 0u64);
    let (mut n, mut d) = (num, den);

    while d != 0 {
        let a = n / d;
        let q2 = q0 + a * q1;
        if q2 > max_den {
            break;
        }
        let p2 = p0 + a * p1;
        (p0, q0, p1, q1) = (p1, q1, p2, q2);
        (n, d) = (d, n - a * d);
    }

    if d == 0 {
        // Exact
        return (p1 as u32, q1 as u32);
    }

    // Largest semiconvergent still within the bound
    let k = (max_den - q0) / q1;
    let (ps, qs) = (p0 + k * p1, q0 + k * q1);

    // Compare |p/q - num/den| via cross-multiplication
    let distance = |p: u64, q: u64| -> u128 {
        let lhs = u128::from(p) * u128::from(den);
        let rhs = u128::from(num) * u128::from(q);
        lhs.abs_diff(rhs)
    };

    if qs > 0 && distance(ps, qs) * u128::from(q1) < distance(p1, q1) * u128::from(qs) {
        (ps as u32, qs as u32)
    } else {
        (p1 as u32, q1 as u32)
    }
}

/// Pack P1/P2/P3 into the 8-byte register layout shared by PLLs and multisynths
#[must_use]
pub fn pack_registers(p1: u32, p2: u32, p3: u32, r_div: u8) -> [u8; 8] {
    [
        ((p3 >> 8) & 0xFF) as u8,
        (p3 & 0xFF) as u8,
        ((r_div & 0x07) << 4) | ((p1 >> 16) & 0x03) as u8,
        ((p1 >> 8) & 0xFF) as u8,
        (p1 & 0xFF) as u8,
        (((p3 >> 12) & 0xF0) | ((p2 >> 16) & 0x0F)) as u8,
        ((p2 >> 8) & 0xFF) as u8,
        (p2 & 0xFF) as u8,
    ]
}
