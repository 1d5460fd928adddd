//! High-level device abstractions.
//!
//! The [`Amplifier`] owns the mirror of the amplifier state and every
//! operation that changes it. The rear, center and sub channels are exposed
//! as [`Satellite`] views borrowed from the amplifier, so there is only ever
//! one copy of the state.
//!
//! Both implement the [`MediaPlayer`] trait, which provides a generic command
//! surface for callers that do not know which kind of player they control.

mod amplifier;
mod satellite;

pub use amplifier::Amplifier;
pub use satellite::{Satellite, SatelliteChannel};

use crate::{Error as ProtocolError, Uart};
use alloc::{string::String, vec::Vec};
use bitflags_derive::{FlagsDebug, FlagsDisplay};
use core::fmt::{Debug, Display, Formatter};
use log::{debug, warn};

/// A specialized [`Result`] type for device operations.
///
/// Uses [`Error<E>`] as the error variant, which can include port-specific errors.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error type for device operations.
///
/// The generic parameter `E` allows the error type to carry a port-specific error.
///
/// This enum is marked `#[non_exhaustive]` to allow for future variants.
#[non_exhaustive]
#[derive(PartialEq, Eq, Debug)]
pub enum Error<E> {
    /// The provided argument is invalid, e.g. an unknown input name.
    InvalidArgument,
    /// The status frame contains a value outside the known enumerations.
    UnexpectedStatusValue,
    /// The player does not support the requested command or property.
    UnsupportedCommand,
    /// Generic protocol error.
    Protocol(ProtocolError<E>),
}

impl<E: core::error::Error> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::UnexpectedStatusValue => write!(f, "unexpected status value"),
            Self::UnsupportedCommand => write!(f, "unsupported command"),
            Self::Protocol(err) => write!(f, "protocol error: {err}"),
        }
    }
}

impl<E: core::error::Error> core::error::Error for Error<E> {}

impl<E> From<ProtocolError<E>> for Error<E> {
    fn from(err: ProtocolError<E>) -> Self {
        Self::Protocol(err)
    }
}

impl<E> From<strum::ParseError> for Error<E> {
    fn from(_err: strum::ParseError) -> Self {
        Self::InvalidArgument
    }
}

bitflags::bitflags! {
    /// High-level operations supported by a player.
    ///
    /// Generic callers use these to decide which controls to offer.
    #[derive(FlagsDisplay, FlagsDebug, PartialEq, Eq, Copy, Clone)]
    pub struct Features: u8 {
        /// Turning the player on and off.
        const Power = 0x01;
        /// Muting and unmuting.
        const Mute = 0x02;
        /// Setting the volume to an absolute value.
        const VolumeSet = 0x04;
        /// Raising and lowering the volume by one step.
        const VolumeStep = 0x08;
        /// Selecting the audio input.
        const SelectSource = 0x10;
        /// Selecting the sound effect.
        const SelectSoundMode = 0x20;
    }
}

/// Power state of the amplifier.
#[derive(strum::Display, PartialEq, Eq, Copy, Clone, Debug)]
pub enum PowerState {
    /// Amplifier is on.
    On,
    /// Amplifier is off.
    Off,
}

/// A command of the generic command surface, see [`MediaPlayer::control`].
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum Call<'a> {
    /// Turn the player on.
    TurnOn,
    /// Turn the player off.
    TurnOff,
    /// Mute the player.
    Mute,
    /// Unmute the player.
    Unmute,
    /// Raise the volume by one step.
    VolumeUp,
    /// Lower the volume by one step.
    VolumeDown,
    /// Set the volume, `0.0..=1.0`.
    VolumeSet(f32),
    /// Select an input by name, e.g. `"Optical 1"`.
    SelectSource(&'a str),
    /// Select a sound effect by name, e.g. `"4.1"`.
    SelectSoundMode(&'a str),
}

impl Call<'_> {
    /// Returns the feature a player must support to accept this command.
    #[must_use]
    pub fn feature(&self) -> Features {
        match self {
            Self::TurnOn | Self::TurnOff => Features::Power,
            Self::Mute | Self::Unmute => Features::Mute,
            Self::VolumeUp | Self::VolumeDown => Features::VolumeStep,
            Self::VolumeSet(_) => Features::VolumeSet,
            Self::SelectSource(_) => Features::SelectSource,
            Self::SelectSoundMode(_) => Features::SelectSoundMode,
        }
    }
}

/// Device property kind.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum PropertyKind {
    /// General properties, e.g. firmware version.
    General,
    /// Audio properties, e.g. channel levels.
    Audio,
    /// Input/output properties, e.g. temperature.
    Io,
}

/// A device property, e.g. the current input.
///
/// Properties can be queried using [`MediaPlayer::query_property`].
#[derive(PartialEq, Eq, Debug)]
pub struct Property {
    /// Property kind.
    pub kind: PropertyKind,
    /// Unique identifier.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Optional unit of the property's value.
    pub unit: Option<&'static str>,
}

/// The value of a device property.
#[derive(PartialEq, Eq, Debug)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Number value.
    Number(u32),
    /// String value of arbitrary length.
    String(String),
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Self::Bool(val)
    }
}

impl From<u8> for Value {
    fn from(val: u8) -> Self {
        Self::Number(val.into())
    }
}

impl From<u16> for Value {
    fn from(val: u16) -> Self {
        Self::Number(val.into())
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Self::String(string)
    }
}

/// Trait implemented by the amplifier and its satellite channels.
///
/// This trait is sealed and cannot be implemented outside this crate.
///
/// # Errors
///
/// - [`Error::Protocol`] for any errors during communication.
///
/// # Examples
///
/// ```no_run
/// use z906::{Clock, Uart, device::{Amplifier, Call, MediaPlayer}};
///
/// # fn example<P: Uart, C: Clock>(port: P, clock: C) -> z906::device::Result<(), P::Error> {
/// let mut amp = Amplifier::new(port, clock);
///
/// for prop in amp.properties() {
///     let val = amp.query_property(prop)?;
///
///     println!("{}: {val:?}", prop.name);
/// }
///
/// if !amp.control(Call::SelectSource("Optical 1")) {
///     println!("Input selection failed");
/// }
/// # Ok(())
/// # }
/// ```
pub trait MediaPlayer<P: Uart>: private::Sealed {
    /// Returns the set of supported operations.
    fn features(&self) -> Features;

    /// Returns the power state, or [`None`] if it has not been set yet.
    fn power(&self) -> Option<PowerState>;

    /// Returns the display volume, `0.0..=1.0`.
    fn volume(&self) -> f32;

    /// Returns the names accepted by [`Call::SelectSource`].
    fn sources(&self) -> Vec<String>;

    /// Returns the names accepted by [`Call::SelectSoundMode`].
    fn sound_modes(&self) -> Vec<String>;

    /// Returns the set of queryable properties.
    ///
    /// Only properties returned here can be queried via [`MediaPlayer::query_property`].
    fn properties(&self) -> &'static [Property];

    /// Queries a specified property from the device.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] if the player does not support the specified property.
    /// - [`Error::UnexpectedStatusValue`] if the device reports an unknown value.
    ///
    /// See the [`MediaPlayer`] documentation for other errors.
    fn query_property(&mut self, prop: &Property) -> Result<Value, P::Error>;

    /// Executes a command of the generic command surface.
    ///
    /// Unsupported and failing commands are logged and leave the state unchanged.
    /// Returns whether the command succeeded.
    fn control(&mut self, call: Call<'_>) -> bool;
}

/// Logs the outcome of a generic command.
fn report<E: Debug>(call: &Call<'_>, res: Result<(), E>) -> bool {
    match res {
        Ok(()) => {
            debug!("Command {call:?} succeeded");
            true
        }
        Err(Error::UnsupportedCommand) => {
            warn!("Ignoring unsupported command {call:?}");
            false
        }
        Err(err) => {
            warn!("Command {call:?} failed: {err:?}");
            false
        }
    }
}

mod private {
    pub trait Sealed {}
}
