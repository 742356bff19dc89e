//! Si5351 Driver Tests
//!
//! Register traffic of the synthesizer driver against a recording bus.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test si5351_tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_futures::block_on;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation};

use wspr_beacon::config::SynthCalibration;
use wspr_beacon::drivers::si5351::{Si5351, Si5351Error};
use wspr_beacon::synth::plan::plan_centihertz;
use wspr_beacon::synth::{ClockOutput, CrystalLoad, DriveStrength, Synthesizer};

/// Register writes seen on the bus: (address, bytes)
type WriteLog = Rc<RefCell<Vec<(u8, Vec<u8>)>>>;

/// Records register writes; status reads return `status`
#[derive(Default)]
struct MockI2c {
    log: WriteLog,
    reads: Rc<Cell<usize>>,
    status: u8,
    fail: bool,
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        // A write followed by a read only selects the register
        let is_read = operations.iter().any(|op| matches!(op, Operation::Read(_)));
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    if !is_read {
                        self.log.borrow_mut().push((address, bytes.to_vec()));
                    }
                }
                Operation::Read(buf) => {
                    buf.fill(self.status);
                    self.reads.set(self.reads.get() + 1);
                }
            }
        }
        Ok(())
    }
}

/// Driver plus a handle on its bus traffic
struct Rig {
    synth: Si5351<MockI2c>,
    log: WriteLog,
    reads: Rc<Cell<usize>>,
}

impl Rig {
    fn new(status: u8) -> Self {
        let bus = MockI2c {
            status,
            ..MockI2c::default()
        };
        let log = Rc::clone(&bus.log);
        let reads = Rc::clone(&bus.reads);
        Self {
            synth: Si5351::new(bus),
            log,
            reads,
        }
    }

    /// Initialised driver with an empty log
    fn ready() -> Self {
        let mut rig = Self::new(0);
        block_on(rig.synth.init(SynthCalibration::beacon())).unwrap();
        rig.log.borrow_mut().clear();
        rig
    }

    fn take_writes(&self) -> Vec<Vec<u8>> {
        self.log
            .borrow_mut()
            .drain(..)
            .map(|(_, bytes)| bytes)
            .collect()
    }
}

fn block(reg: u8, values: [u8; 8]) -> Vec<u8> {
    let mut bytes = vec![reg];
    bytes.extend_from_slice(&values);
    bytes
}

/// 14.0956 MHz dial + 1500 Hz
const TONE_0: u64 = 1_409_710_000;

// =============================================================================
// Initialisation Tests
// =============================================================================

#[test]
fn test_init_sequence() {
    let mut rig = Rig::new(0);

    block_on(rig.synth.init(SynthCalibration::beacon())).unwrap();

    assert_eq!(rig.reads.get(), 1);
    assert_eq!(
        rig.take_writes(),
        vec![
            vec![3, 0xFF],
            vec![183, CrystalLoad::Load8pF.as_reg()],
            vec![16, 0x80],
            vec![17, 0x80],
            vec![18, 0x80],
        ]
    );
}

#[test]
fn test_writes_go_to_device_address() {
    let mut rig = Rig::new(0);
    block_on(rig.synth.init(SynthCalibration::beacon())).unwrap();

    assert!(rig.log.borrow().iter().all(|(addr, _)| *addr == 0x60));
}

#[test]
fn test_init_waits_for_device() {
    // SYS_INIT never clears: the driver gives up waiting and carries on
    let mut rig = Rig::new(0x80);

    block_on(rig.synth.init(SynthCalibration::beacon())).unwrap();

    assert_eq!(rig.reads.get(), 1_000);
    assert_eq!(rig.take_writes().len(), 5);
}

#[test]
fn test_init_applies_calibration() {
    let mut rig = Rig::new(0);
    let calibration = SynthCalibration {
        load: CrystalLoad::Load10pF,
        reference_offset_hz: 1_000,
        correction_ppb: -2_000,
    };

    block_on(rig.synth.init(calibration)).unwrap();

    assert_eq!(rig.synth.xtal_hz(), 25_000_950);
    assert!(rig
        .take_writes()
        .contains(&vec![183, CrystalLoad::Load10pF.as_reg()]));
}

// =============================================================================
// Frequency Tests
// =============================================================================

#[test]
fn test_first_frequency_programs_divisor() {
    let mut rig = Rig::ready();
    let plan = plan_centihertz(25_000_000, TONE_0).unwrap();

    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();

    assert_eq!(
        rig.take_writes(),
        vec![
            block(26, plan.pll.register_block()),
            block(42, plan.ms.register_block()),
            vec![16, 0x4C | DriveStrength::Drive8mA.as_reg()],
            vec![177, 0x20],
        ]
    );
}

#[test]
fn test_tone_step_rewrites_only_pll() {
    let mut rig = Rig::ready();
    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();
    rig.take_writes();

    let next = TONE_0 + 146;
    let plan = plan_centihertz(25_000_000, next).unwrap();
    block_on(rig.synth.set_frequency(next, ClockOutput::Clk0)).unwrap();

    assert_eq!(rig.take_writes(), vec![block(26, plan.pll.register_block())]);
}

#[test]
fn test_band_change_reprograms_divisor() {
    let mut rig = Rig::ready();
    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();
    rig.take_writes();

    // 7.0386 MHz dial + 1500 Hz needs a different divisor
    block_on(rig.synth.set_frequency(704_010_000, ClockOutput::Clk0)).unwrap();

    let writes = rig.take_writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[1][0], 42);
    assert_eq!(writes[3], vec![177, 0x20]);
}

#[test]
fn test_other_output_registers() {
    let mut rig = Rig::ready();

    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk1)).unwrap();

    let writes = rig.take_writes();
    assert_eq!(writes[1][0], 50);
    assert_eq!(writes[2][0], 17);
}

#[test]
fn test_unreachable_frequencies() {
    let mut rig = Rig::ready();

    // 250 MHz and 1 kHz
    for centihertz in [25_000_000_000, 100_000] {
        assert_eq!(
            block_on(rig.synth.set_frequency(centihertz, ClockOutput::Clk0)),
            Err(Si5351Error::Unreachable)
        );
    }
    assert!(rig.take_writes().is_empty());
}

// =============================================================================
// Output Control Tests
// =============================================================================

#[test]
fn test_output_enable_bits() {
    let mut rig = Rig::ready();

    block_on(rig.synth.enable_output(ClockOutput::Clk0, true)).unwrap();
    block_on(rig.synth.enable_output(ClockOutput::Clk2, true)).unwrap();
    block_on(rig.synth.enable_output(ClockOutput::Clk0, false)).unwrap();

    assert_eq!(
        rig.take_writes(),
        vec![vec![3, 0xFE], vec![3, 0xFA], vec![3, 0xFB]]
    );
}

#[test]
fn test_drive_strength_applies_once_configured() {
    let mut rig = Rig::ready();

    // Powered down: remembered only
    block_on(rig.synth.set_drive_strength(ClockOutput::Clk0, DriveStrength::Drive4mA)).unwrap();
    assert!(rig.take_writes().is_empty());

    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();
    assert!(rig.take_writes().contains(&vec![16, 0x4C | DriveStrength::Drive4mA.as_reg()]));

    block_on(rig.synth.set_drive_strength(ClockOutput::Clk0, DriveStrength::Drive2mA)).unwrap();
    assert_eq!(rig.take_writes(), vec![vec![16, 0x4C]]);
}

#[test]
fn test_init_forgets_divisors() {
    let mut rig = Rig::ready();
    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();
    block_on(rig.synth.init(SynthCalibration::beacon())).unwrap();
    rig.take_writes();

    block_on(rig.synth.set_frequency(TONE_0, ClockOutput::Clk0)).unwrap();

    assert_eq!(rig.take_writes().len(), 4);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_bus_error() {
    let mut synth = Si5351::new(MockI2c {
        fail: true,
        ..MockI2c::default()
    });

    assert_eq!(
        block_on(synth.init(SynthCalibration::beacon())),
        Err(Si5351Error::Bus(ErrorKind::Other))
    );
    assert_eq!(
        block_on(synth.enable_output(ClockOutput::Clk0, true)),
        Err(Si5351Error::Bus(ErrorKind::Other))
    );
}
