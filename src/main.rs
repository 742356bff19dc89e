//! WSPR Beacon Main Application
//!
//! Entry point for the STM32G474-based WSPR beacon firmware.
//! Initializes hardware and runs the beacon control loop.

#![no_std]
#![no_main]

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, BufferedUart};
use embassy_stm32::{bind_interrupts, peripherals};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use wspr_beacon::hal::gpio::{operator_button, status_leds};
use wspr_beacon::prelude::*;

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    USART1 => usart::BufferedInterruptHandler<peripherals::USART1>;
    I2C1_EV => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

/// Transmission parameters, checked at compile time
const TX_CONFIG: TransmissionConfig = match TransmissionConfig::beacon() {
    Some(config) => config,
    None => panic!("POWER_DBM is not a reportable power level"),
};

static GPS_RX_BUF: StaticCell<[u8; GPS_RX_BUFFER_SIZE]> = StaticCell::new();
static GPS_TX_BUF: StaticCell<[u8; GPS_TX_BUFFER_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("WSPR Beacon Firmware v{}", env!("CARGO_PKG_VERSION"));

    // Initialize STM32G474 peripherals with default clock configuration
    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    // I2C1 for the Si5351A: PB8 = SCL, PB9 = SDA
    let i2c = I2c::new(
        p.I2C1,
        p.PB8, // SCL
        p.PB9, // SDA
        Irqs,
        p.DMA1_CH1,
        p.DMA1_CH2,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );

    // USART1 from the GPS module: PA10 = RX (PA9 = TX, not connected)
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = GPS_BAUD_RATE;
    let uart = BufferedUart::new(
        p.USART1,
        Irqs,
        p.PA10,
        p.PA9,
        GPS_TX_BUF.init([0; GPS_TX_BUFFER_SIZE]),
        GPS_RX_BUF.init([0; GPS_RX_BUFFER_SIZE]),
        uart_config,
    )
    .expect("GPS UART configuration");
    let (_gps_tx, gps_rx) = uart.split();

    info!("Peripherals initialized");

    let band = BandState::new(band_plan(), DEFAULT_BAND_INDEX).expect("band plan");

    let hardware = BeaconHardware {
        gps: GpsReceiver::new(gps_rx),
        button: operator_button(p.PB4),
        leds: status_leds(p.PA5, p.PB0, p.PB1),
        synth: Si5351::new(i2c),
        clock: EmbassyClock::new(),
    };
    let mut runner = BeaconRunner::new(hardware, WsprEncoder::new(), TX_CONFIG, band);

    while let Err(e) = runner.start(SynthCalibration::beacon()).await {
        error!("Si5351 init failed: {}", e);
        Timer::after(Duration::from_secs(1)).await;
    }

    loop {
        if let Err(e) = runner.run_cycle().await {
            error!("Cycle failed: {}", e);
        }
    }
}
