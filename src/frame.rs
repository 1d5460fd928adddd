//! Frame encoding and validation.
//!
//! The amplifier answers a status request with a [`Status`] frame:
//!
//! | Offset | Field |
//! | --- | --- |
//! | `0x00` | start marker ([`START`]) |
//! | `0x01` | model identifier ([`MODEL_STATUS`]) |
//! | `0x02` | payload length (frame length minus 4) |
//! | `0x03..=0x06` | main, rear, center and sub levels |
//! | `0x07` | current input number |
//! | `0x08` | unknown |
//! | `0x09..=0x0e` | sound effect of each input (see [`Input::effect_offset`]) |
//! | `0x0f` | S/PDIF status |
//! | `0x10` | signal status |
//! | `0x11..=0x13` | firmware version digits |
//! | `0x14` | standby |
//! | `0x15` | auto standby |
//! | `..` | additional payload bytes on some firmware versions |
//! | last | checksum ([`compute_checksum`]) |
//!
//! Levels are changed by sending back a copy of a freshly read status
//! frame with the level byte replaced (see [`Status::command`]).

use crate::tables::{Channel, Input};
use alloc::vec::Vec;
use core::{
    fmt::{Display, Formatter},
    num::Wrapping,
};
use strum::VariantArray;

/// Start marker of status and temperature frames.
pub const START: u8 = 0xaa;

/// Model identifier of status frames.
pub const MODEL_STATUS: u8 = 0x0a;

/// Model identifier of temperature frames.
pub const MODEL_TEMPERATURE: u8 = 0x0c;

/// Minimum length of a status frame, which is also the length of the first read.
pub const STATUS_MIN_LEN: usize = 0x17;

/// Length of the acknowledgement sent in reply to a command frame.
pub const ACK_LEN: usize = 0x05;

/// Length of a temperature frame.
pub const TEMPERATURE_LEN: usize = 0x0a;

const OFFSET_START: usize = 0x00;
const OFFSET_MODEL: usize = 0x01;
const OFFSET_LENGTH: usize = 0x02;
const OFFSET_EFFECTS: usize = 0x09;
const OFFSET_EXTRA: usize = 0x16;

// Start, model and length bytes plus the trailing checksum
const FRAMING_LEN: usize = 4;

/// Error raised when a received frame is malformed.
#[non_exhaustive]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum FrameError {
    /// The first byte is not the start marker.
    InvalidStart(u8),
    /// The model identifier does not match.
    InvalidModel(u8),
    /// The trailing checksum does not match the frame contents.
    ChecksumMismatch {
        /// Checksum computed over the frame.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },
    /// The frame is shorter than allowed or disagrees with its length field.
    InvalidLength(usize),
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            Self::InvalidStart(b) => write!(f, "invalid start marker: {b:#04x}"),
            Self::InvalidModel(b) => write!(f, "invalid model identifier: {b:#04x}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, got {actual:#04x}")
            }
            Self::InvalidLength(len) => write!(f, "invalid frame length: {len}"),
        }
    }
}

impl core::error::Error for FrameError {}

/// Computes the longitudinal redundancy check of a frame.
///
/// Every byte except the first and the last is subtracted from zero.
/// The result is stored in the last byte of the frame.
#[must_use]
pub fn compute_checksum(frame: &[u8]) -> u8 {
    let interior = frame.get(1..frame.len().saturating_sub(1)).unwrap_or(&[]);

    interior
        .iter()
        .fold(Wrapping(0u8), |lrc, &x| lrc - Wrapping(x))
        .0
}

/// Checks the start marker and model identifier of a status frame.
///
/// Only the first two bytes are inspected, so this can be used
/// before the rest of the frame has been received.
pub fn check_status_header(frame: &[u8]) -> Result<(), FrameError> {
    match frame {
        [start, ..] if *start != START => Err(FrameError::InvalidStart(*start)),
        [_, model, ..] if *model != MODEL_STATUS => Err(FrameError::InvalidModel(*model)),
        [_, _, ..] => Ok(()),
        _ => Err(FrameError::InvalidLength(frame.len())),
    }
}

/// Returns the total length declared by the length field of a status frame.
pub fn declared_status_len(frame: &[u8]) -> Result<usize, FrameError> {
    let len = frame
        .get(OFFSET_LENGTH)
        .map(|&payload| usize::from(payload) + FRAMING_LEN)
        .ok_or(FrameError::InvalidLength(frame.len()))?;

    if len < STATUS_MIN_LEN {
        return Err(FrameError::InvalidLength(len));
    }

    Ok(len)
}

/// Volume levels of the four channels.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Levels {
    /// Main (front) level, `0..=43`.
    pub main: u8,
    /// Rear level, `0..=59`.
    pub rear: u8,
    /// Center level, `0..=59`.
    pub center: u8,
    /// Subwoofer level, `0..=59`.
    pub sub: u8,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            main: 5,
            rear: 30,
            center: 30,
            sub: 30,
        }
    }
}

impl Levels {
    /// Returns the level of a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Main => self.main,
            Channel::Rear => self.rear,
            Channel::Center => self.center,
            Channel::Sub => self.sub,
        }
    }

    /// Sets the level of a channel.
    pub fn set(&mut self, channel: Channel, level: u8) {
        match channel {
            Channel::Main => self.main = level,
            Channel::Rear => self.rear = level,
            Channel::Center => self.center = level,
            Channel::Sub => self.sub = level,
        }
    }

    /// Returns whether every level is within its channel's range.
    #[must_use]
    pub fn in_range(&self) -> bool {
        Channel::VARIANTS
            .iter()
            .all(|&channel| self.get(channel) <= channel.max_level())
    }

    /// Raises or lowers the level of a channel by one step,
    /// staying within `0..=channel.max_level()`.
    ///
    /// A level above the range is clamped before stepping.
    pub fn step(&mut self, channel: Channel, up: bool) {
        let level = self.get(channel).min(channel.max_level());
        let level = if up {
            level.saturating_add(1).min(channel.max_level())
        } else {
            level.saturating_sub(1)
        };

        self.set(channel, level);
    }
}

/// Decoded status frame.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Status {
    /// Channel levels.
    pub levels: Levels,
    /// Current input number (see [`Input::from_repr`]).
    pub input: u8,
    /// Byte following the input number, meaning unknown.
    pub unknown: u8,
    /// Sound effect status bytes in wire order.
    ///
    /// Only the byte belonging to the current input is meaningful,
    /// use [`Status::effect_status`] to look it up.
    pub effects: [u8; 6],
    /// S/PDIF status.
    pub spdif_status: u8,
    /// Signal status.
    pub signal_status: u8,
    /// Firmware version digits.
    pub version: [u8; 3],
    /// Standby status.
    pub standby: u8,
    /// Auto standby status.
    pub auto_standby: u8,
    /// Payload bytes beyond the minimum frame length.
    pub extra: Vec<u8>,
}

impl Status {
    /// Validates and decodes a complete status frame.
    ///
    /// # Errors
    ///
    /// - [`FrameError::InvalidStart`] if the start marker is wrong.
    /// - [`FrameError::InvalidModel`] if the model identifier is wrong.
    /// - [`FrameError::InvalidLength`] if the frame disagrees with its length field.
    /// - [`FrameError::ChecksumMismatch`] if the trailing checksum is wrong.
    pub fn parse(frame: &[u8]) -> Result<Self, FrameError> {
        check_status_header(frame)?;

        if declared_status_len(frame)? != frame.len() {
            return Err(FrameError::InvalidLength(frame.len()));
        }

        let expected = compute_checksum(frame);
        let actual = frame[frame.len() - 1];

        if actual != expected {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }

        let mut effects = [0x00; 6];
        effects.copy_from_slice(&frame[OFFSET_EFFECTS..OFFSET_EFFECTS + 6]);

        Ok(Self {
            levels: Levels {
                main: frame[0x03],
                rear: frame[0x04],
                center: frame[0x05],
                sub: frame[0x06],
            },
            input: frame[0x07],
            unknown: frame[0x08],
            effects,
            spdif_status: frame[0x0f],
            signal_status: frame[0x10],
            version: [frame[0x11], frame[0x12], frame[0x13]],
            standby: frame[0x14],
            auto_standby: frame[0x15],
            extra: frame[OFFSET_EXTRA..frame.len() - 1].to_vec(),
        })
    }

    /// Encodes the status into a frame, including length field and checksum.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = STATUS_MIN_LEN + self.extra.len();
        let mut buf = Vec::with_capacity(len);

        buf.extend_from_slice(&[START, MODEL_STATUS]);
        buf.push(u8::try_from(len - FRAMING_LEN).unwrap_or(u8::MAX));
        buf.extend_from_slice(&[
            self.levels.main,
            self.levels.rear,
            self.levels.center,
            self.levels.sub,
            self.input,
            self.unknown,
        ]);
        buf.extend_from_slice(&self.effects);
        buf.extend_from_slice(&[self.spdif_status, self.signal_status]);
        buf.extend_from_slice(&self.version);
        buf.extend_from_slice(&[self.standby, self.auto_standby]);
        buf.extend_from_slice(&self.extra);
        buf.push(0x00);

        let checksum = compute_checksum(&buf);

        if let Some(last) = buf.last_mut() {
            *last = checksum;
        }

        buf
    }

    /// Builds a command frame setting the level of a single channel.
    ///
    /// The status must have been read immediately before,
    /// as every other field is written back to the device unchanged.
    #[must_use]
    pub fn command(&self, channel: Channel, level: u8) -> Vec<u8> {
        let mut status = self.clone();

        status.levels.set(channel, level);
        status.to_bytes()
    }

    /// Returns the raw sound effect status stored for an input.
    #[must_use]
    pub fn effect_status(&self, input: Input) -> u8 {
        self.effects[usize::from(input.effect_offset()) - OFFSET_EFFECTS]
    }

    /// Returns the firmware version as a decimal number, e.g. `302` for version 3.0.2.
    #[must_use]
    pub fn firmware_version(&self) -> u16 {
        let [a, b, c] = self.version.map(u16::from);

        a * 100 + b * 10 + c
    }
}

/// Validates a temperature frame and returns the sensor reading.
///
/// # Errors
///
/// - [`FrameError::InvalidLength`] if the frame does not have [`TEMPERATURE_LEN`] bytes.
/// - [`FrameError::InvalidModel`] if the model identifier is wrong.
pub fn parse_temperature(frame: &[u8]) -> Result<u8, FrameError> {
    if frame.len() != TEMPERATURE_LEN {
        return Err(FrameError::InvalidLength(frame.len()));
    }

    if frame[2] != MODEL_TEMPERATURE {
        return Err(FrameError::InvalidModel(frame[2]));
    }

    Ok(frame[7])
}
