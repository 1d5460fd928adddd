//! Native serial port support for [`Interface`](crate::Interface).
//!
//! Uses the [`serialport`](https://crates.io/crates/serialport) crate.

use crate::Uart;
use embedded_io::ErrorType;
use embedded_io_adapters::std::FromStd;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::{boxed::Box, time::Duration};

/// Serial port type implementing [`Uart`].
pub type Port = FromStd<Box<dyn SerialPort>>;

/// Port-specific error type to be used as `E` for the generic [`Error<E>`](crate::Error) type.
pub type PortError = <Port as ErrorType>::Error;

impl Uart for Port {
    fn available(&mut self) -> Result<usize, PortError> {
        let len = self.inner().bytes_to_read()?;

        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }
}

/// Opens a native serial port at the given path.
///
/// The port is configured for the amplifier console: 57600 baud, 8 data bits,
/// odd parity and 1 stop bit. Pending input and output is discarded.
///
/// Returns a [`Port`] that can be passed to [`Interface::new`](crate::Interface::new).
pub fn open(path: &str) -> Result<Port, PortError> {
    let port = serialport::new(path, 57_600)
        .data_bits(DataBits::Eight)
        .parity(Parity::Odd)
        .stop_bits(StopBits::One)
        // Reads only happen once the bytes are available
        .timeout(Duration::from_millis(100))
        .open()?;

    port.clear(ClearBuffer::All)?;

    Ok(FromStd::new(port))
}
