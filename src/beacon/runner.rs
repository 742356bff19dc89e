//! Beacon Runner
//!
//! The effect layer. It gathers the cycle's inputs from the hardware,
//! asks the [`Scheduler`] what to do, and carries out the returned
//! [`Intent`] on the LEDs and the synthesizer. All hardware is reached
//! through traits so the whole loop runs on the host in tests.

use core::fmt;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::beacon::band::BandState;
use crate::beacon::button::ButtonClassifier;
use crate::beacon::emitter::SymbolEmitter;
use crate::beacon::scheduler::{CycleInput, Intent, Scheduler, TransmitKind};
use crate::beacon::time_gate;
use crate::config::{
    SynthCalibration, TransmissionConfig, BAND_BLINK_OFF_MS, BAND_BLINK_ON_MS, CYCLE_PERIOD_MS,
    FORCED_TX_PAUSE_MS, GPS_DRAIN_SLICE_MS, POST_TX_PAUSE_MS,
};
use crate::gps::{FixSource, GpsWatchdog};
use crate::synth::Synthesizer;
use crate::timing::{poll_until, CancelToken, Clock, PollOutcome};
use crate::wspr::SymbolEncoder;

/// A failed control cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconError<S, E> {
    /// Synthesizer error during a transmission
    Synth(S),
    /// The message could not be encoded
    Encode(E),
    /// The encoder produced a different number of symbols than configured
    SymbolCount {
        /// `TransmissionConfig::symbol_count`
        expected: usize,
        /// Symbols in the encoded buffer
        actual: usize,
    },
}

impl<S: fmt::Debug, E: fmt::Debug> fmt::Display for BeaconError<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synth(e) => write!(f, "synthesizer error: {e:?}"),
            Self::Encode(e) => write!(f, "encoder error: {e:?}"),
            Self::SymbolCount { expected, actual } => {
                write!(f, "encoded {actual} symbols, expected {expected}")
            }
        }
    }
}

#[cfg(feature = "embedded")]
impl<S: defmt::Format, E: defmt::Format> defmt::Format for BeaconError<S, E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Synth(e) => defmt::write!(f, "synthesizer error: {}", e),
            Self::Encode(e) => defmt::write!(f, "encoder error: {}", e),
            Self::SymbolCount { expected, actual } => {
                defmt::write!(f, "encoded {} symbols, expected {}", actual, expected);
            }
        }
    }
}

/// The three status indicators
#[derive(Debug)]
pub struct StatusLeds<L> {
    /// Valid position fix
    pub fix: L,
    /// Trusted time (steady) or liveness (blinking)
    pub time: L,
    /// On air; also blinks the band acknowledgement
    pub tx: L,
}

/// Indicator writes are best effort
fn set_led<L: OutputPin>(led: &mut L, on: bool) {
    let _ = if on { led.set_high() } else { led.set_low() };
}

/// Hardware the runner drives
#[derive(Debug)]
pub struct BeaconHardware<G, B, L, S, C> {
    /// GPS feed
    pub gps: G,
    /// Operator button (active low)
    pub button: B,
    /// Status indicators
    pub leds: StatusLeds<L>,
    /// Frequency synthesizer
    pub synth: S,
    /// Time source
    pub clock: C,
}

/// Wait for `ms`, draining the GPS stream at least every
/// `GPS_DRAIN_SLICE_MS`
pub async fn wait_draining<C, G>(clock: &mut C, gps: &mut G, ms: u32, cancel: &CancelToken) -> PollOutcome
where
    C: Clock,
    G: FixSource,
{
    poll_until(clock, ms, GPS_DRAIN_SLICE_MS, cancel, || {
        gps.drain();
        false
    })
    .await
}

/// Control loop context
pub struct BeaconRunner<G, B, L, S, C, E> {
    hw: BeaconHardware<G, B, L, S, C>,
    encoder: E,
    config: TransmissionConfig,
    scheduler: Scheduler,
    classifier: ButtonClassifier,
    emitter: SymbolEmitter,
    watchdog: GpsWatchdog,
    cancel: CancelToken,
    time_led_on: bool,
}

impl<G, B, L, S, C, E> BeaconRunner<G, B, L, S, C, E>
where
    G: FixSource,
    B: InputPin,
    L: OutputPin,
    S: Synthesizer,
    C: Clock,
    E: SymbolEncoder,
{
    /// Assemble the runner
    pub fn new(
        hw: BeaconHardware<G, B, L, S, C>,
        encoder: E,
        config: TransmissionConfig,
        band: BandState,
    ) -> Self {
        let watchdog = GpsWatchdog::new(hw.clock.now_ms());
        Self {
            hw,
            encoder,
            emitter: SymbolEmitter::new(&config),
            config,
            scheduler: Scheduler::new(band),
            classifier: ButtonClassifier::new(),
            watchdog,
            cancel: CancelToken::new(),
            time_led_on: false,
        }
    }

    /// Initialise the synthesizer and clear the indicators
    ///
    /// # Errors
    /// Returns the synthesizer error if the device cannot be set up.
    pub async fn start(&mut self, calibration: SynthCalibration) -> Result<(), S::Error> {
        set_led(&mut self.hw.leds.fix, false);
        set_led(&mut self.hw.leds.time, false);
        set_led(&mut self.hw.leds.tx, false);

        self.hw.synth.init(calibration).await?;
        info!(
            "WSPR beacon {=str} {} {}",
            self.config.callsign,
            self.config.power,
            self.scheduler.band()
        );
        Ok(())
    }

    /// Scheduler context
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Attached hardware
    pub const fn hardware(&self) -> &BeaconHardware<G, B, L, S, C> {
        &self.hw
    }

    /// Token that cuts short the runner's waits
    ///
    /// A cancel applies to the cycle in progress (or the next one, if set
    /// between cycles); the token is cleared when that cycle ends.
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run one control cycle, including the trailing cycle wait
    ///
    /// Returns the intent that was carried out.
    ///
    /// # Errors
    /// Returns the synthesizer or encoder error of a failed transmission,
    /// or `SymbolCount` when the encoded buffer does not match the
    /// configured symbol count (nothing is keyed then).
    /// The runner stays usable; the next cycle starts from fresh inputs.
    pub async fn run_cycle(&mut self) -> Result<Intent, BeaconError<S::Error, E::Error>> {
        self.hw.gps.drain();

        let gps = &mut self.hw.gps;
        let press = self
            .classifier
            .measure(&mut self.hw.button, &mut self.hw.clock, &self.cancel, || {
                gps.drain();
            })
            .await
            .press();

        let fix = *self.hw.gps.fix();
        self.watchdog.check(self.hw.clock.now_ms(), fix.chars_processed);

        let intent = self.scheduler.decide(CycleInput { press, fix: &fix });
        trace!("Cycle: {} -> {}", intent, self.scheduler.state());

        set_led(&mut self.hw.leds.fix, self.scheduler.has_fix());
        if time_gate::is_plausible(&fix.date) {
            self.set_time_led(true);
        } else if intent != Intent::Blink {
            self.set_time_led(false);
        }

        let result = self.execute(intent).await;
        self.wait(CYCLE_PERIOD_MS).await;
        self.cancel.reset();
        result.map(|()| intent)
    }

    async fn execute(&mut self, intent: Intent) -> Result<(), BeaconError<S::Error, E::Error>> {
        match intent {
            Intent::NoOp => Ok(()),
            Intent::Blink => {
                self.set_time_led(!self.time_led_on);
                Ok(())
            }
            Intent::AdvanceBand { ordinal } => {
                self.acknowledge_band(ordinal).await;
                Ok(())
            }
            Intent::Transmit(kind) => self.transmit(kind).await,
        }
    }

    /// Blink the transmit LED `ordinal` times
    async fn acknowledge_band(&mut self, ordinal: usize) {
        for _ in 0..ordinal {
            set_led(&mut self.hw.leds.tx, true);
            self.wait(BAND_BLINK_ON_MS).await;
            set_led(&mut self.hw.leds.tx, false);
            self.wait(BAND_BLINK_OFF_MS).await;
        }
    }

    async fn transmit(&mut self, kind: TransmitKind) -> Result<(), BeaconError<S::Error, E::Error>> {
        let symbols = match self.encoder.encode(
            self.config.callsign,
            self.scheduler.locator(),
            self.config.power,
        ) {
            Ok(symbols) => symbols,
            Err(e) => {
                self.scheduler.transmission_finished();
                return Err(BeaconError::Encode(e));
            }
        };
        if symbols.len() != self.config.symbol_count {
            self.scheduler.transmission_finished();
            return Err(BeaconError::SymbolCount {
                expected: self.config.symbol_count,
                actual: symbols.len(),
            });
        }

        let carrier = self.scheduler.band().current();
        info!(
            "TX start ({}): {=str} {} {} on {}",
            kind,
            self.config.callsign,
            self.scheduler.locator(),
            self.config.power,
            carrier
        );

        self.scheduler.transmission_started();
        set_led(&mut self.hw.leds.tx, true);
        let result = self
            .emitter
            .emit(&mut self.hw.synth, &mut self.hw.clock, symbols.as_slice(), carrier)
            .await;
        set_led(&mut self.hw.leds.tx, false);
        self.scheduler.transmission_finished();

        let report = result.map_err(BeaconError::Synth)?;
        info!("TX done: {} symbols in {}ms", report.symbols, report.elapsed_ms);

        let pause = match kind {
            TransmitKind::Scheduled => POST_TX_PAUSE_MS,
            TransmitKind::Forced => FORCED_TX_PAUSE_MS,
        };
        self.wait(pause).await;
        Ok(())
    }

    async fn wait(&mut self, ms: u32) {
        wait_draining(&mut self.hw.clock, &mut self.hw.gps, ms, &self.cancel).await;
    }

    fn set_time_led(&mut self, on: bool) {
        self.time_led_on = on;
        set_led(&mut self.hw.leds.time, on);
    }
}
