//! Control a Logitech Z906 5.1 surround amplifier via its serial console.
//!
//! # Overview
//!
//! The `z906` crate implements the binary protocol spoken by the Z906 control
//! console connector. It offers a blocking, platform-agnostic API that runs on
//! a microcontroller UART as well as on a desktop serial port.
//!
//! Depending on your needs, you can:
//!
//! - Use the high-level [`device`] module, which mirrors the amplifier state
//!   (power, mute, channel levels, input and sound effect) and keeps it
//!   consistent across the main unit and the rear, center and sub channels.
//! - Work directly with the low-level [`Interface`], which performs single
//!   request/response exchanges.
//!
//! # Getting started
//!
//! The amplifier exposes a UART on the 15-pin console connector,
//! configured as follows:
//!
//! - **Baud rate:** 57600
//! - **Parity:** Odd
//! - **Data bits:** 8
//! - **Stop bits:** 1
//!
//! Any port implementing [`Uart`] can be used. If you enable the
//! `native-serial` feature, you can obtain a compatible serial port
//! instance using [`serial::open`].
//! A [`Clock`] is required to bound every exchange in time.
//! The `std` feature provides [`StdClock`].
//!
//! # Examples
//!
//! ## Controlling the amplifier using the high-level [`device`] module
//!
//! ```no_run
//! use z906::{Clock, Uart, device::{Amplifier, SatelliteChannel}, tables::Input};
//!
//! # fn example<P: Uart, C: Clock>(port: P, clock: C) -> z906::device::Result<(), P::Error> {
//! let mut amp = Amplifier::new(port, clock);
//!
//! amp.refresh()?;
//! amp.turn_on()?;
//! amp.select_input(Input::Optical1)?;
//! amp.satellite(SatelliteChannel::Sub).set(0.75)?;
//!
//! println!("Input: {:?}, effect: {:?}", amp.input(), amp.sound_effect());
//! # Ok(())
//! # }
//! ```
//!
//! ## Low-level access using [`Interface`]
//!
//! ```no_run
//! use z906::{Clock, Command, Interface, Uart};
//!
//! # fn example<P: Uart, C: Clock>(port: P, clock: C) -> z906::Result<(), P::Error> {
//! let mut intf = Interface::new(port, clock);
//! let status = intf.query_status()?;
//!
//! println!("Firmware version: {}", status.firmware_version());
//!
//! intf.send_command(Command::MuteOn)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Protocol details
//!
//! Most commands are a single byte answered by a single byte.
//! Channel levels are set by reading the complete status frame,
//! replacing the level byte and writing the frame back with a new checksum
//! (see [`frame`]). The amplifier may send unsolicited bytes, e.g. when it
//! enters auto standby, so pending input is discarded before every request.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod clock;
pub mod device;
pub mod frame;
pub mod tables;

#[cfg(feature = "native-serial")]
#[cfg_attr(docsrs, doc(cfg(feature = "native-serial")))]
pub mod serial;

pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use embedded_io;

use crate::{
    frame::{FrameError, Status},
    tables::Channel,
};
use alloc::{vec, vec::Vec};
use core::{
    fmt::{Display, Formatter},
    time::Duration,
};
use embedded_io::{Read, ReadExactError, Write};
use log::{debug, trace, warn};

/// A specialized [`Result`] type for [`Interface`] operations.
///
/// Uses [`Error<E>`] as the error variant, which can include port-specific errors.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error type for [`Interface`] operations.
///
/// The generic parameter `E` allows the error type to carry a port-specific error.
///
/// This enum is marked `#[non_exhaustive]` to allow for future variants.
#[non_exhaustive]
#[derive(PartialEq, Eq, Debug)]
pub enum Error<E> {
    /// The received frame is malformed.
    Frame(FrameError),
    /// The reply did not arrive completely before the deadline.
    Timeout {
        /// Number of bytes waited for.
        expected: usize,
        /// Number of bytes available when the deadline passed.
        available: usize,
    },
    /// The port encountered an unexpected end-of-file.
    UnexpectedEof,
    /// A port-specific input/output error.
    Io(E),
}

impl<E: core::error::Error> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            Self::Frame(err) => write!(f, "invalid frame: {err}"),
            Self::Timeout {
                expected,
                available,
            } => write!(
                f,
                "timed out waiting for {expected} bytes ({available} available)"
            ),
            Self::UnexpectedEof => write!(f, "unexpected end-of-file"),
            Self::Io(err) => write!(f, "input/output error: {err}"),
        }
    }
}

impl<E: core::error::Error> core::error::Error for Error<E> {}

impl<E> From<FrameError> for Error<E> {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

impl<E> From<ReadExactError<E>> for Error<E> {
    fn from(err: ReadExactError<E>) -> Self {
        match err {
            ReadExactError::UnexpectedEof => Self::UnexpectedEof,
            ReadExactError::Other(err) => Self::Io(err),
        }
    }
}

/// Blocking byte stream connected to the amplifier.
///
/// Extends [`Read`] and [`Write`] with a query for the number of bytes
/// that can be read without blocking.
/// All timeout handling is done by [`Interface`] on top of this query.
pub trait Uart: Read + Write {
    /// Returns the number of bytes waiting in the receive buffer.
    fn available(&mut self) -> core::result::Result<usize, Self::Error>;
}

impl<T: Uart + ?Sized> Uart for &mut T {
    fn available(&mut self) -> core::result::Result<usize, Self::Error> {
        (**self).available()
    }
}

/// Single-byte command understood by the amplifier.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Command {
    /// Selects the 3.5 mm input.
    SelectInput1 = 0x02,
    /// Selects the first optical input.
    SelectInput3 = 0x03,
    /// Selects the second optical input.
    SelectInput4 = 0x04,
    /// Selects the RCA input.
    SelectInput2 = 0x05,
    /// Selects the coaxial input.
    SelectInput5 = 0x06,
    /// Selects the 6-channel direct input.
    SelectInput6 = 0x07,
    /// Raises the main level.
    MainUp = 0x08,
    /// Lowers the main level.
    MainDown = 0x09,
    /// Raises the subwoofer level.
    SubUp = 0x0a,
    /// Lowers the subwoofer level.
    SubDown = 0x0b,
    /// Raises the center level.
    CenterUp = 0x0c,
    /// Lowers the center level.
    CenterDown = 0x0d,
    /// Raises the rear level.
    RearUp = 0x0e,
    /// Lowers the rear level.
    RearDown = 0x0f,
    /// Turns the amplifier off.
    PowerOff = 0x10,
    /// Turns the amplifier on.
    PowerOn = 0x11,
    /// Selects the 3D sound effect.
    Effect3d = 0x14,
    /// Selects the 4.1 sound effect.
    Effect41 = 0x15,
    /// Selects the 2.1 sound effect.
    Effect21 = 0x16,
    /// Ignores input selection from the console.
    BlockInputs = 0x22,
    /// Requests a temperature frame.
    QueryTemperature = 0x25,
    /// Resets the power-up time counter.
    ResetPowerUpTime = 0x30,
    /// Accepts input selection from the console again.
    UnblockInputs = 0x33,
    /// Requests a status frame.
    QueryStatus = 0x34,
    /// Disables sound processing.
    EffectNone = 0x35,
    /// Saves the current settings to EEPROM.
    SaveEeprom = 0x36,
    /// Mutes all channels.
    MuteOn = 0x38,
    /// Unmutes all channels.
    MuteOff = 0x39,
}

/// Timing configuration of an [`Interface`].
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for a complete reply.
    pub timeout: Duration,
    /// Grace period between flushing the port and discarding pending input.
    pub settle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            settle: Duration::from_millis(5),
        }
    }
}

/// Blocking amplifier protocol interface.
///
/// Requires a port that implements [`Uart`] and a [`Clock`] for timeouts.
/// Every exchange fully completes (or fails) before the next one starts,
/// and failed exchanges are never retried.
///
/// Most users should control the amplifier through [`device::Amplifier`],
/// which keeps track of the amplifier state.
#[derive(Debug)]
pub struct Interface<P, C> {
    port: P,
    clock: C,
    config: Config,
}

impl<P: Uart, C: Clock> Interface<P, C> {
    /// Constructs a new interface with the default [`Config`].
    pub fn new(port: P, clock: C) -> Self {
        Self::with_config(port, clock, Config::default())
    }

    /// Constructs a new interface with a custom [`Config`].
    pub fn with_config(port: P, clock: C, config: Config) -> Self {
        Self {
            port,
            clock,
            config,
        }
    }

    /// Returns the timing configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the underlying port.
    pub fn port(&mut self) -> &mut P {
        &mut self.port
    }

    /// Sends a single-byte command and waits for its one-byte acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the acknowledgement does not arrive in time.
    pub fn send_command(&mut self, cmd: Command) -> Result<(), P::Error> {
        trace!("Sending command: {cmd:?}");

        let resp = self.exchange(&[cmd as u8], 1, self.config.timeout)?;

        trace!("Command acknowledged with {:02x?}", resp.first());

        Ok(())
    }

    /// Queries the complete status frame.
    ///
    /// The frame is read in two phases: first the minimum frame length,
    /// then, if the length field announces a longer frame, the remainder.
    /// Both phases share the same deadline, which starts once the request is written.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the frame does not arrive in time.
    /// - [`Error::Frame`] if the frame is malformed.
    pub fn query_status(&mut self) -> Result<Status, P::Error> {
        let start = self.request(&[Command::QueryStatus as u8])?;
        let mut frame = self.receive(frame::STATUS_MIN_LEN, start, self.config.timeout)?;

        // Do not trust the length field of a frame that is not a status frame
        frame::check_status_header(&frame)?;

        let len = frame::declared_status_len(&frame)?;

        if len > frame.len() {
            let remaining = len - frame.len();

            trace!("Status frame announces {remaining} more bytes");
            self.wait_for(remaining, start, self.config.timeout)?;

            let mut rest = vec![0x00; remaining];

            self.read(&mut rest)?;
            frame.extend_from_slice(&rest);
        }

        let status = Status::parse(&frame)?;

        debug!("Received status: {status:?}");

        Ok(status)
    }

    /// Writes a command frame and waits for the acknowledgement frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the acknowledgement does not arrive in time.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), P::Error> {
        self.exchange(frame, frame::ACK_LEN, self.config.timeout)?;

        Ok(())
    }

    /// Sets the level of a channel.
    ///
    /// A fresh status frame is read first and written back with only the level changed,
    /// so that settings changed on the amplifier itself are not overwritten.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if either exchange does not complete in time.
    /// - [`Error::Frame`] if the status frame is malformed.
    pub fn set_level(&mut self, channel: Channel, level: u8) -> Result<(), P::Error> {
        let status = self.query_status()?;

        self.write_frame(&status.command(channel, level))
    }

    /// Queries the temperature sensor reading of the amplifier.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the temperature frame does not arrive in time.
    /// - [`Error::Frame`] if the temperature frame is malformed.
    pub fn query_temperature(&mut self) -> Result<u8, P::Error> {
        let frame = self.exchange(
            &[Command::QueryTemperature as u8],
            frame::TEMPERATURE_LEN,
            self.config.timeout,
        )?;

        Ok(frame::parse_temperature(&frame)?)
    }

    /// Performs a single request/response exchange.
    ///
    /// Pending input is discarded, the request is written and exactly `len`
    /// reply bytes are read once they are available. Returns [`Error::Timeout`]
    /// if fewer than `len` bytes arrive within `timeout`.
    pub fn exchange(
        &mut self,
        req: &[u8],
        len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, P::Error> {
        let start = self.request(req)?;

        self.receive(len, start, timeout)
    }

    /// Discards pending input and writes a request.
    ///
    /// Returns the time the request was written, which starts the reply deadline.
    fn request(&mut self, req: &[u8]) -> Result<Duration, P::Error> {
        self.clear()?;
        self.write(req)?;

        Ok(self.clock.now())
    }

    /// Reads exactly `len` bytes once they are available, or times out `timeout` after `start`.
    fn receive(
        &mut self,
        len: usize,
        start: Duration,
        timeout: Duration,
    ) -> Result<Vec<u8>, P::Error> {
        self.wait_for(len, start, timeout)?;

        let mut resp = vec![0x00; len];

        self.read(&mut resp)?;

        Ok(resp)
    }

    /// Discards all pending input.
    ///
    /// Output is flushed and the port is given a short grace period
    /// before the receive buffer is drained.
    fn clear(&mut self) -> Result<(), P::Error> {
        self.port.flush().map_err(Error::Io)?;
        self.clock.delay(self.config.settle);

        let stale = self.port.available().map_err(Error::Io)?;

        if stale > 0 {
            let mut buf = vec![0x00; stale];

            self.port.read_exact(&mut buf)?;
            trace!("Discarded stale bytes: {buf:02x?}");
        }

        Ok(())
    }

    /// Busy-waits until at least `len` bytes are available or `timeout` has passed since `start`.
    fn wait_for(&mut self, len: usize, start: Duration, timeout: Duration) -> Result<(), P::Error> {
        loop {
            let available = self.port.available().map_err(Error::Io)?;

            if available >= len {
                return Ok(());
            }

            if self.clock.now().saturating_sub(start) > timeout {
                warn!("Timed out waiting for {len} bytes, only {available} available");

                return Err(Error::Timeout {
                    expected: len,
                    available,
                });
            }
        }
    }

    /// Reads data from the port into the provided buffer.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), P::Error> {
        self.port.read_exact(buf)?;
        trace!("Read from port: {buf:02x?}");

        Ok(())
    }

    /// Writes the provided buffer to the port.
    fn write(&mut self, buf: &[u8]) -> Result<(), P::Error> {
        trace!("Write to port: {buf:02x?}");
        self.port.write_all(buf).map_err(Error::Io)
    }
}
