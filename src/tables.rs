//! Translation between protocol codes and names.
//!
//! Each enum variant is the single source of both directions of a mapping:
//! names are parsed and printed through [`strum`], status bytes are decoded
//! through `from_repr` and command codes are derived by exhaustive matches.

use crate::Command;
use strum::{Display, EnumString, FromRepr, VariantArray};

/// Audio input.
///
/// The representation is the input number reported in the status frame.
#[derive(FromRepr, Display, EnumString, VariantArray, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Input {
    /// 3.5 mm jack.
    #[strum(to_string = "3.5 mm")]
    Jack = 0x00,
    /// RCA connector.
    #[strum(to_string = "RCA")]
    Rca = 0x01,
    /// First optical input.
    #[strum(to_string = "Optical 1")]
    Optical1 = 0x02,
    /// Second optical input.
    #[strum(to_string = "Optical 2")]
    Optical2 = 0x03,
    /// Coaxial input.
    #[strum(to_string = "Coaxial")]
    Coaxial = 0x04,
    /// 6-channel direct input.
    #[strum(to_string = "Aux")]
    Aux = 0x06,
}

impl Input {
    /// Returns the command selecting this input.
    #[must_use]
    pub const fn select_command(self) -> Command {
        match self {
            Self::Jack => Command::SelectInput1,
            Self::Rca => Command::SelectInput2,
            Self::Optical1 => Command::SelectInput3,
            Self::Optical2 => Command::SelectInput4,
            Self::Coaxial => Command::SelectInput5,
            Self::Aux => Command::SelectInput6,
        }
    }

    /// Returns the status frame offset holding this input's sound effect.
    #[must_use]
    pub const fn effect_offset(self) -> u8 {
        match self {
            Self::Optical2 => 0x09,
            Self::Coaxial => 0x0a,
            Self::Rca => 0x0b,
            Self::Aux => 0x0c,
            Self::Jack => 0x0d,
            Self::Optical1 => 0x0e,
        }
    }

    /// Looks up the input selected by a command code.
    #[must_use]
    pub fn from_select_code(code: u8) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|input| input.select_command() as u8 == code)
    }
}

/// Sound effect (surround processing mode).
///
/// The representation is the effect status reported in the status frame.
#[derive(FromRepr, Display, EnumString, VariantArray, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum SoundEffect {
    /// 3D surround.
    #[strum(to_string = "3D")]
    ThreeD = 0x00,
    /// 2.1 stereo with subwoofer.
    #[strum(to_string = "2.1")]
    TwoOne = 0x01,
    /// 4.1 surround with subwoofer.
    #[strum(to_string = "4.1")]
    FourOne = 0x02,
    /// No processing.
    #[strum(to_string = "Default")]
    None = 0x03,
}

impl SoundEffect {
    /// Returns the command selecting this sound effect.
    #[must_use]
    pub const fn select_command(self) -> Command {
        match self {
            Self::ThreeD => Command::Effect3d,
            Self::TwoOne => Command::Effect21,
            Self::FourOne => Command::Effect41,
            Self::None => Command::EffectNone,
        }
    }

    /// Looks up the sound effect selected by a command code.
    #[must_use]
    pub fn from_select_code(code: u8) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|effect| effect.select_command() as u8 == code)
    }
}

/// Amplifier output channel.
///
/// The representation is both the status frame offset of the
/// channel's level and the level code of command frames.
#[derive(FromRepr, Display, EnumString, VariantArray, PartialEq, Eq, Copy, Clone, Debug)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Channel {
    /// Front speakers (master level).
    Main = 0x03,
    /// Rear speakers.
    Rear = 0x04,
    /// Center speaker.
    Center = 0x05,
    /// Subwoofer.
    Sub = 0x06,
}

impl Channel {
    /// Returns the highest level accepted by the channel.
    #[must_use]
    pub const fn max_level(self) -> u8 {
        match self {
            Self::Main => 43,
            Self::Rear | Self::Center | Self::Sub => 59,
        }
    }

    /// Returns the command raising the channel's level by one step.
    #[must_use]
    pub const fn up_command(self) -> Command {
        match self {
            Self::Main => Command::MainUp,
            Self::Rear => Command::RearUp,
            Self::Center => Command::CenterUp,
            Self::Sub => Command::SubUp,
        }
    }

    /// Returns the command lowering the channel's level by one step.
    #[must_use]
    pub const fn down_command(self) -> Command {
        match self {
            Self::Main => Command::MainDown,
            Self::Rear => Command::RearDown,
            Self::Center => Command::CenterDown,
            Self::Sub => Command::SubDown,
        }
    }

    /// Maps a volume in `0.0..=1.0` onto the channel's level range, rounding half up.
    ///
    /// Values outside the range are clamped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn level_from_volume(self, volume: f32) -> u8 {
        let volume = volume.clamp(0.0, 1.0);

        // Truncation of a non-negative value after adding 0.5 rounds half up
        (volume * f32::from(self.max_level()) + 0.5) as u8
    }

    /// Maps a level onto the volume range `0.0..=1.0`.
    #[must_use]
    pub fn volume_from_level(self, level: u8) -> f32 {
        f32::from(level.min(self.max_level())) / f32::from(self.max_level())
    }
}
