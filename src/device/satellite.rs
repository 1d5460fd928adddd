//! Rear, center and sub channel views.

use super::{
    Amplifier, Call, Error, Features, MediaPlayer, PowerState, Property, PropertyKind, Result,
    Value, private, report,
};
use crate::{Clock, Uart, tables::Channel};
use alloc::{string::String, vec::Vec};
use strum::{Display, EnumString, VariantArray};

const PROP_LEVEL: Property = Property {
    kind: PropertyKind::Audio,
    id: "level",
    name: "Level",
    unit: None,
};

/// Channel that can be controlled through a [`Satellite`].
#[derive(Display, EnumString, VariantArray, PartialEq, Eq, Copy, Clone, Debug)]
#[strum(serialize_all = "lowercase")]
pub enum SatelliteChannel {
    /// Rear speakers.
    Rear,
    /// Center speaker.
    Center,
    /// Subwoofer.
    Sub,
}

impl SatelliteChannel {
    /// Returns the amplifier channel controlled by this satellite.
    #[must_use]
    pub const fn channel(self) -> Channel {
        match self {
            Self::Rear => Channel::Rear,
            Self::Center => Channel::Center,
            Self::Sub => Channel::Sub,
        }
    }
}

/// Volume control of a single satellite channel.
///
/// Borrowed from [`Amplifier::satellite`]. The satellite has no state of its own:
/// every operation goes through the amplifier and the display volume is
/// derived from the amplifier's level mirror.
pub struct Satellite<'a, P, C> {
    amp: &'a mut Amplifier<P, C>,
    channel: SatelliteChannel,
}

impl<'a, P: Uart, C: Clock> Satellite<'a, P, C> {
    pub(super) fn new(amp: &'a mut Amplifier<P, C>, channel: SatelliteChannel) -> Self {
        Self { amp, channel }
    }

    /// Returns the channel controlled by this satellite.
    pub fn channel(&self) -> SatelliteChannel {
        self.channel
    }

    /// Returns the power state of the amplifier.
    pub fn power(&self) -> Option<PowerState> {
        self.amp.power()
    }

    /// Returns the mirrored level of the channel.
    pub fn level(&self) -> u8 {
        self.amp.levels().get(self.channel.channel())
    }

    /// Returns the display volume of the channel, `0.0..=1.0`.
    pub fn volume(&self) -> f32 {
        let channel = self.channel.channel();

        channel.volume_from_level(self.amp.levels().get(channel))
    }

    /// Raises the level by one step.
    pub fn step_up(&mut self) -> Result<(), P::Error> {
        self.amp.step_volume(self.channel.channel(), true)
    }

    /// Lowers the level by one step.
    pub fn step_down(&mut self) -> Result<(), P::Error> {
        self.amp.step_volume(self.channel.channel(), false)
    }

    /// Sets the volume, `0.0..=1.0`.
    pub fn set(&mut self, volume: f32) -> Result<(), P::Error> {
        self.amp.set_volume(self.channel.channel(), volume)
    }
}

impl<P: Uart, C: Clock> MediaPlayer<P> for Satellite<'_, P, C> {
    fn features(&self) -> Features {
        Features::VolumeSet | Features::VolumeStep
    }

    fn power(&self) -> Option<PowerState> {
        Satellite::power(self)
    }

    fn volume(&self) -> f32 {
        Satellite::volume(self)
    }

    fn sources(&self) -> Vec<String> {
        Vec::new()
    }

    fn sound_modes(&self) -> Vec<String> {
        Vec::new()
    }

    fn properties(&self) -> &'static [Property] {
        &[PROP_LEVEL]
    }

    fn query_property(&mut self, prop: &Property) -> Result<Value, P::Error> {
        match *prop {
            PROP_LEVEL => {
                let status = self.amp.interface().query_status()?;

                Ok(status.levels.get(self.channel.channel()).into())
            }
            _ => Err(Error::UnsupportedCommand),
        }
    }

    fn control(&mut self, call: Call<'_>) -> bool {
        let res = match call {
            Call::VolumeUp => self.step_up(),
            Call::VolumeDown => self.step_down(),
            Call::VolumeSet(volume) => self.set(volume),
            _ => Err(Error::UnsupportedCommand),
        };

        report(&call, res)
    }
}

impl<P, C> private::Sealed for Satellite<'_, P, C> {}
