use std::time::Duration;

use clap::{Parser, Subcommand};
use sx127x_rs::logging::init_logger;
use sx127x_rs::radio::{symbol_duration, time_on_air, IrqFlags};
use sx127x_rs::{
    Bandwidth, CodingRate, DriverError, Event, InterruptSource, ManualTimer, MemoryPort,
    SpreadingFactor, StateCommand, Sx127x,
};

#[derive(Parser)]
#[command(name = "sx127x-cli")]
#[command(about = "Exercise the SX127x driver core against an in-memory radio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Center frequency in Hz
    #[arg(long, default_value = "868300000")]
    freq: u32,
    /// Spreading factor (6-12)
    #[arg(long, default_value = "7")]
    sf: u8,
    /// Bandwidth code (7=125k, 8=250k, 9=500k)
    #[arg(long, default_value = "7")]
    bw: u8,
    /// Coding rate (1=4/5 .. 4=4/8)
    #[arg(long, default_value = "1")]
    cr: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage a hex payload and walk it through the transmit path
    Send { payload: String },
    /// Simulate arrival of a hex payload and drain it
    Recv { payload: String },
    /// Compute the on-air time of a payload length
    Airtime {
        len: u8,
        #[arg(short, long, default_value = "8")]
        preamble: u16,
    },
}

fn main() -> Result<(), DriverError> {
    init_logger();
    let cli = Cli::parse();

    let mut radio = Sx127x::new(MemoryPort::new(), ManualTimer::new(), ManualTimer::new());
    radio.init()?;
    radio.set_channel(cli.freq)?;
    radio.set_spreading_factor(SpreadingFactor::try_from(cli.sf)?)?;
    radio.set_bandwidth(Bandwidth::try_from(cli.bw)?)?;
    radio.set_coding_rate(CodingRate::try_from(cli.cr)?)?;
    radio.set_event_callback(|event: Event| println!("event: {event:?}"));

    match cli.command {
        Commands::Send { payload } => {
            let payload = hex::decode(&payload).map_err(|_| DriverError::InvalidArgument)?;
            let sent = radio.send(&[payload.as_slice()])?;
            println!("staged {sent} bytes: {}", hex::encode(radio.port().tx_data()));
            println!("on air for {:?}", time_on_air(radio.settings(), sent));
            // The in-memory radio completes instantly.
            radio.port_mut().latch_irq(IrqFlags::TX_DONE);
            radio.raise_interrupt(InterruptSource::Dio0);
            radio.dispatch()?;
        }
        Commands::Recv { payload } => {
            let payload = hex::decode(&payload).map_err(|_| DriverError::InvalidArgument)?;
            radio.set_state(StateCommand::Rx)?;
            radio.port_mut().load_rx(&payload);
            radio.port_mut().latch_irq(IrqFlags::RX_DONE);
            radio.raise_interrupt(InterruptSource::Dio0);
            radio.dispatch()?;

            let mut buf = [0u8; 255];
            let (len, info) = radio.receive(Some(&mut buf), true)?;
            println!("received {len} bytes: {}", hex::encode(&buf[..len]));
            if let Some(info) = info {
                println!("rssi {} dBm, snr {} dB", info.rssi, info.snr);
            }
        }
        Commands::Airtime { len, preamble } => {
            let mut settings = radio.settings().clone();
            settings.preamble_length = preamble;
            let toa = time_on_air(&settings, len as usize);
            println!(
                "{len} byte payload at sf{} / {} Hz bw: {:?} ({} ms)",
                cli.sf,
                settings.bandwidth.hz(),
                toa,
                toa.as_secs_f64() * 1e3
            );
            let symbol: Duration = symbol_duration(&settings);
            println!("symbol period {:?}", symbol);
        }
    }

    Ok(())
}
