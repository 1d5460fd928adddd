use clap::{Parser, Subcommand};
use std::error::Error;
use z906::{
    StdClock,
    device::{Amplifier, MediaPlayer},
    tables::Channel,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port path
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print all properties of the amplifier
    Status,
    /// Turn the amplifier on
    On,
    /// Turn the amplifier off
    Off,
    /// Mute all channels
    Mute,
    /// Unmute all channels
    Unmute,
    /// Raise the level of a channel (main, rear, center or sub)
    Up { channel: String },
    /// Lower the level of a channel (main, rear, center or sub)
    Down { channel: String },
    /// Set the volume of a channel, from 0.0 to 1.0
    Volume { channel: String, volume: f32 },
    /// Select an input, e.g. "Optical 1"
    Input { name: String },
    /// Select the sound effect of the current input, e.g. "4.1"
    Effect { name: String },
    /// Print the temperature sensor reading
    Temperature,
    /// Save the current settings to EEPROM
    Save,
}

fn parse_channel(name: &str) -> Result<Channel, String> {
    name.parse()
        .map_err(|_| format!("unknown channel: {name} (expected main, rear, center or sub)"))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();

    let port = z906::serial::open(&args.port)?;
    let mut amp = Amplifier::new(port, StdClock::new());

    match args.command {
        Cmd::Status => {
            for prop in amp.properties() {
                let val = amp.query_property(prop)?;

                println!("{}: {val:?}", prop.name);
            }
        }
        Cmd::On => amp.turn_on()?,
        Cmd::Off => amp.turn_off()?,
        Cmd::Mute => amp.mute()?,
        Cmd::Unmute => amp.unmute()?,
        Cmd::Up { channel } => amp.step_volume(parse_channel(&channel)?, true)?,
        Cmd::Down { channel } => amp.step_volume(parse_channel(&channel)?, false)?,
        Cmd::Volume { channel, volume } => amp.set_volume(parse_channel(&channel)?, volume)?,
        Cmd::Input { name } => {
            amp.select_source(&name)?;

            if let Some(effect) = amp.sound_effect() {
                println!("Sound effect: {effect}");
            }
        }
        Cmd::Effect { name } => amp.select_sound_mode(&name)?,
        Cmd::Temperature => println!("Temperature: {}", amp.query_temperature()?),
        Cmd::Save => amp.save_settings()?,
    }

    Ok(())
}
