//! Main unit of the amplifier.

use super::{
    Call, Error, Features, MediaPlayer, PowerState, Property, PropertyKind, Result, Value,
    private, report,
};
use crate::{
    Clock, Command, Interface, Uart,
    device::{Satellite, SatelliteChannel},
    frame::{Levels, Status},
    tables::{Channel, Input, SoundEffect},
};
use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};
use log::{debug, warn};
use strum::VariantArray;

const PROP_FIRMWARE_VERSION: Property = Property {
    kind: PropertyKind::General,
    id: "firmware_version",
    name: "Firmware Version",
    unit: None,
};
const PROP_MAIN_LEVEL: Property = Property {
    kind: PropertyKind::Audio,
    id: "main_level",
    name: "Main Level",
    unit: None,
};
const PROP_REAR_LEVEL: Property = Property {
    kind: PropertyKind::Audio,
    id: "rear_level",
    name: "Rear Level",
    unit: None,
};
const PROP_CENTER_LEVEL: Property = Property {
    kind: PropertyKind::Audio,
    id: "center_level",
    name: "Center Level",
    unit: None,
};
const PROP_SUB_LEVEL: Property = Property {
    kind: PropertyKind::Audio,
    id: "sub_level",
    name: "Subwoofer Level",
    unit: None,
};
const PROP_INPUT: Property = Property {
    kind: PropertyKind::Audio,
    id: "input",
    name: "Input",
    unit: None,
};
const PROP_SOUND_EFFECT: Property = Property {
    kind: PropertyKind::Audio,
    id: "sound_effect",
    name: "Sound Effect",
    unit: None,
};
const PROP_TEMPERATURE: Property = Property {
    kind: PropertyKind::Io,
    id: "temperature",
    name: "Temperature",
    unit: None,
};
const PROP_SPDIF_STATUS: Property = Property {
    kind: PropertyKind::Io,
    id: "spdif_status",
    name: "S/PDIF Status",
    unit: None,
};
const PROP_SIGNAL_STATUS: Property = Property {
    kind: PropertyKind::Io,
    id: "signal_status",
    name: "Signal Status",
    unit: None,
};
const PROP_STANDBY: Property = Property {
    kind: PropertyKind::Io,
    id: "standby",
    name: "Standby",
    unit: None,
};
const PROP_AUTO_STANDBY: Property = Property {
    kind: PropertyKind::Io,
    id: "auto_standby",
    name: "Auto Standby",
    unit: None,
};

/// Logitech Z906 main unit.
///
/// Mirrors the amplifier state: power, mute, the four channel levels,
/// the current input and its sound effect. The mirror is only updated
/// from confirmed exchanges, so a failing operation leaves it untouched.
///
/// The power and mute state are unknown until they are set for the first time,
/// the levels start at main 5 and rear/center/sub 30 until the first [`Amplifier::refresh`].
pub struct Amplifier<P, C> {
    intf: Interface<P, C>,
    power: Option<PowerState>,
    muted: Option<bool>,
    levels: Levels,
    input: Option<Input>,
    effect: Option<SoundEffect>,
    callbacks: Vec<Box<dyn FnMut()>>,
}

impl<P: Uart, C: Clock> Amplifier<P, C> {
    /// Constructs a new amplifier using the default interface configuration.
    ///
    /// No communication takes place until the first operation.
    pub fn new(port: P, clock: C) -> Self {
        Self::with_interface(Interface::new(port, clock))
    }

    /// Constructs a new amplifier on top of an existing interface.
    pub fn with_interface(intf: Interface<P, C>) -> Self {
        Self {
            intf,
            power: None,
            muted: None,
            levels: Levels::default(),
            input: None,
            effect: None,
            callbacks: Vec::new(),
        }
    }

    /// Registers a callback invoked after every operation that changed the state.
    ///
    /// Callbacks are invoked in registration order, once per completed operation.
    pub fn add_on_state_callback<F: FnMut() + 'static>(&mut self, callback: F) {
        self.callbacks.push(Box::new(callback));
    }

    /// Returns the power state, or [`None`] if it has not been set yet.
    pub fn power(&self) -> Option<PowerState> {
        self.power
    }

    /// Returns the mute state, or [`None`] if it has not been set yet.
    pub fn muted(&self) -> Option<bool> {
        self.muted
    }

    /// Returns the mirrored channel levels.
    pub fn levels(&self) -> Levels {
        self.levels
    }

    /// Returns the current input, or [`None`] if it is not known yet.
    pub fn input(&self) -> Option<Input> {
        self.input
    }

    /// Returns the sound effect of the current input, or [`None`] if it is not known yet.
    pub fn sound_effect(&self) -> Option<SoundEffect> {
        self.effect
    }

    /// Returns the display volume of the main channel, `0.0..=1.0`.
    pub fn volume(&self) -> f32 {
        Channel::Main.volume_from_level(self.levels.main)
    }

    /// Returns a view of one of the satellite channels.
    pub fn satellite(&mut self, channel: SatelliteChannel) -> Satellite<'_, P, C> {
        Satellite::new(self, channel)
    }

    /// Reads the status frame and replaces the levels, input and sound effect mirrors.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedStatusValue`] if a level is out of range
    ///   or the input or sound effect is unknown.
    /// - [`Error::Protocol`] if the status frame could not be read.
    ///
    /// The mirror is left unchanged on error.
    pub fn refresh(&mut self) -> Result<(), P::Error> {
        self.run("Refresh", Self::fetch_status)
    }

    /// Turns the amplifier on.
    ///
    /// The power state of the satellite channels follows the main unit.
    pub fn turn_on(&mut self) -> Result<(), P::Error> {
        self.run("Turn on", |amp| amp.apply_power(PowerState::On))
    }

    /// Turns the amplifier off.
    pub fn turn_off(&mut self) -> Result<(), P::Error> {
        self.run("Turn off", |amp| amp.apply_power(PowerState::Off))
    }

    /// Mutes all channels.
    pub fn mute(&mut self) -> Result<(), P::Error> {
        self.run("Mute", |amp| amp.apply_mute(true))
    }

    /// Unmutes all channels.
    pub fn unmute(&mut self) -> Result<(), P::Error> {
        self.run("Unmute", |amp| amp.apply_mute(false))
    }

    /// Sets the volume of a channel, `0.0..=1.0`.
    ///
    /// The volume is mapped linearly onto the channel's level range, rounding half up.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the volume is not finite.
    /// - [`Error::Protocol`] if either the status read or the command frame exchange fails.
    pub fn set_volume(&mut self, channel: Channel, volume: f32) -> Result<(), P::Error> {
        self.run("Set volume", |amp| amp.apply_volume(channel, volume))
    }

    /// Raises (`up == true`) or lowers the level of a channel by one step.
    ///
    /// The mirrored level is adjusted without reading back the status,
    /// clamped to the channel's range in the same way the amplifier clamps.
    pub fn step_volume(&mut self, channel: Channel, up: bool) -> Result<(), P::Error> {
        self.run("Step volume", |amp| amp.apply_step(channel, up))
    }

    /// Selects an input.
    ///
    /// As the sound effect is stored per input, the status is read back afterwards.
    /// A failure of that read is logged, and the sound effect mirror then keeps its previous value.
    pub fn select_input(&mut self, input: Input) -> Result<(), P::Error> {
        self.run("Select input", |amp| {
            amp.intf.send_command(input.select_command())?;
            amp.input = Some(input);

            if let Err(err) = amp.fetch_status() {
                warn!("Failed to read sound effect of {input}: {err:?}");
            }

            Ok(())
        })
    }

    /// Selects an input by name, e.g. `"Optical 1"`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the name is unknown.
    pub fn select_source(&mut self, name: &str) -> Result<(), P::Error> {
        self.select_input(name.parse()?)
    }

    /// Selects the sound effect of the current input.
    pub fn select_sound_effect(&mut self, effect: SoundEffect) -> Result<(), P::Error> {
        self.run("Select sound effect", |amp| {
            amp.intf.send_command(effect.select_command())?;
            amp.effect = Some(effect);

            Ok(())
        })
    }

    /// Selects the sound effect of the current input by name, e.g. `"4.1"`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the name is unknown.
    pub fn select_sound_mode(&mut self, name: &str) -> Result<(), P::Error> {
        self.select_sound_effect(name.parse()?)
    }

    /// Queries the amplifier's temperature sensor reading.
    pub fn query_temperature(&mut self) -> Result<u8, P::Error> {
        Ok(self.intf.query_temperature()?)
    }

    /// Saves the current settings to the amplifier's EEPROM.
    pub fn save_settings(&mut self) -> Result<(), P::Error> {
        Ok(self.intf.send_command(Command::SaveEeprom)?)
    }

    /// Blocks (`true`) or unblocks input selection from the console.
    pub fn block_inputs(&mut self, block: bool) -> Result<(), P::Error> {
        let cmd = if block {
            Command::BlockInputs
        } else {
            Command::UnblockInputs
        };

        Ok(self.intf.send_command(cmd)?)
    }

    /// Resets the amplifier's power-up time counter.
    pub fn reset_power_up_time(&mut self) -> Result<(), P::Error> {
        Ok(self.intf.send_command(Command::ResetPowerUpTime)?)
    }

    /// Returns a mutable reference to the underlying interface.
    pub fn interface(&mut self) -> &mut Interface<P, C> {
        &mut self.intf
    }

    /// Runs an operation, notifying the callbacks on success and logging failures.
    fn run<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut Self) -> Result<T, P::Error>,
    ) -> Result<T, P::Error> {
        match f(self) {
            Ok(val) => {
                debug!("{op} completed");

                for callback in &mut self.callbacks {
                    callback();
                }

                Ok(val)
            }
            Err(err) => {
                warn!("{op} failed: {err:?}");
                Err(err)
            }
        }
    }

    fn fetch_status(&mut self) -> Result<(), P::Error> {
        let status = self.intf.query_status()?;

        if !status.levels.in_range() {
            return Err(Error::UnexpectedStatusValue);
        }

        let input =
            Input::from_repr(status.input).ok_or(Error::<P::Error>::UnexpectedStatusValue)?;
        let effect = SoundEffect::from_repr(status.effect_status(input))
            .ok_or(Error::<P::Error>::UnexpectedStatusValue)?;

        self.levels = status.levels;
        self.input = Some(input);
        self.effect = Some(effect);

        debug!(
            "Levels: {:?}, input: {input}, sound effect: {effect}",
            self.levels
        );

        Ok(())
    }

    fn apply_power(&mut self, state: PowerState) -> Result<(), P::Error> {
        let cmd = match state {
            PowerState::On => Command::PowerOn,
            PowerState::Off => Command::PowerOff,
        };

        self.intf.send_command(cmd)?;
        self.power = Some(state);

        Ok(())
    }

    fn apply_mute(&mut self, muted: bool) -> Result<(), P::Error> {
        let cmd = if muted {
            Command::MuteOn
        } else {
            Command::MuteOff
        };

        self.intf.send_command(cmd)?;
        self.muted = Some(muted);

        Ok(())
    }

    fn apply_volume(&mut self, channel: Channel, volume: f32) -> Result<(), P::Error> {
        if !volume.is_finite() {
            return Err(Error::InvalidArgument);
        }

        let level = channel.level_from_volume(volume);

        self.intf.set_level(channel, level)?;
        self.levels.set(channel, level);

        Ok(())
    }

    fn apply_step(&mut self, channel: Channel, up: bool) -> Result<(), P::Error> {
        let cmd = if up {
            channel.up_command()
        } else {
            channel.down_command()
        };

        self.intf.send_command(cmd)?;
        self.levels.step(channel, up);

        Ok(())
    }

    fn query_status(&mut self) -> Result<Status, P::Error> {
        Ok(self.intf.query_status()?)
    }
}

impl<P: Uart, C: Clock> MediaPlayer<P> for Amplifier<P, C> {
    fn features(&self) -> Features {
        Features::all()
    }

    fn power(&self) -> Option<PowerState> {
        self.power
    }

    fn volume(&self) -> f32 {
        Amplifier::volume(self)
    }

    fn sources(&self) -> Vec<String> {
        Input::VARIANTS.iter().map(ToString::to_string).collect()
    }

    fn sound_modes(&self) -> Vec<String> {
        SoundEffect::VARIANTS
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn properties(&self) -> &'static [Property] {
        &[
            PROP_FIRMWARE_VERSION,
            PROP_MAIN_LEVEL,
            PROP_REAR_LEVEL,
            PROP_CENTER_LEVEL,
            PROP_SUB_LEVEL,
            PROP_INPUT,
            PROP_SOUND_EFFECT,
            PROP_TEMPERATURE,
            PROP_SPDIF_STATUS,
            PROP_SIGNAL_STATUS,
            PROP_STANDBY,
            PROP_AUTO_STANDBY,
        ]
    }

    fn query_property(&mut self, prop: &Property) -> Result<Value, P::Error> {
        if *prop == PROP_TEMPERATURE {
            return Ok(self.query_temperature()?.into());
        }

        let status = self.query_status()?;
        let input: Result<Input, P::Error> =
            Input::from_repr(status.input).ok_or(Error::UnexpectedStatusValue);

        match *prop {
            // General
            PROP_FIRMWARE_VERSION => Ok(status.firmware_version().into()),
            // Audio
            PROP_MAIN_LEVEL => Ok(status.levels.main.into()),
            PROP_REAR_LEVEL => Ok(status.levels.rear.into()),
            PROP_CENTER_LEVEL => Ok(status.levels.center.into()),
            PROP_SUB_LEVEL => Ok(status.levels.sub.into()),
            PROP_INPUT => Ok(input?.to_string().into()),
            PROP_SOUND_EFFECT => SoundEffect::from_repr(status.effect_status(input?))
                .map(|effect| effect.to_string().into())
                .ok_or(Error::UnexpectedStatusValue),
            // Input/output
            PROP_SPDIF_STATUS => Ok(status.spdif_status.into()),
            PROP_SIGNAL_STATUS => Ok(status.signal_status.into()),
            PROP_STANDBY => Ok((status.standby != 0x00).into()),
            PROP_AUTO_STANDBY => Ok((status.auto_standby != 0x00).into()),
            _ => Err(Error::UnsupportedCommand),
        }
    }

    fn control(&mut self, call: Call<'_>) -> bool {
        // Level changes on the main unit also unmute, as with the remote
        let res = match call {
            Call::TurnOn => self.turn_on(),
            Call::TurnOff => self.turn_off(),
            Call::Mute => self.mute(),
            Call::Unmute => self.unmute(),
            Call::VolumeUp | Call::VolumeDown => self.run("Step main volume", |amp| {
                amp.apply_step(Channel::Main, call == Call::VolumeUp)?;
                amp.apply_mute(false)
            }),
            Call::VolumeSet(volume) => self.run("Set main volume", |amp| {
                amp.apply_volume(Channel::Main, volume)?;
                amp.apply_mute(false)
            }),
            Call::SelectSource(name) => self.select_source(name),
            Call::SelectSoundMode(name) => self.select_sound_mode(name),
        };

        report(&call, res)
    }
}

impl<P, C> private::Sealed for Amplifier<P, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error as ProtocolError,
        frame::{
            self, FrameError,
            tests::{FRAME, status_frame},
        },
        tests::{MockClock, MockPort, init_logger},
    };
    use alloc::{rc::Rc, vec};
    use core::{cell::RefCell, convert::Infallible};

    #[test]
    fn initial_state() {
        let mut port = MockPort::new([]);
        let amp = Amplifier::new(&mut port, MockClock::default());

        assert_eq!(amp.levels(), Levels::default(), "levels should be defaults");
        assert_eq!(amp.power(), None, "power should be unset");
        assert_eq!(amp.muted(), None, "mute should be unset");
        assert_eq!(amp.input(), None, "input should be unset");
    }

    #[test]
    fn refresh() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([status_frame(
            [10, 20, 21, 22],
            0x04,
            [0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
        )]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        amp.refresh()?;

        assert_eq!(amp.levels().sub, 22, "sub level should be correct");
        assert_eq!(amp.input(), Some(Input::Coaxial), "input should be correct");
        assert_eq!(
            amp.sound_effect(),
            Some(SoundEffect::TwoOne),
            "sound effect should be read at the coaxial offset"
        );

        Ok(())
    }

    #[test]
    fn set_main_volume() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([FRAME.to_vec(), vec![0x00; 5]]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.set_volume(Channel::Main, 0.5)?;

            assert_eq!(amp.levels().main, 22, "main level should be correct");
            assert!(
                (amp.volume() - 22.0 / 43.0).abs() < f32::EPSILON,
                "display volume should follow the level"
            );
        }

        let mut cmd = FRAME;

        cmd[3] = 22;
        cmd[22] = 0x5c;

        assert_eq!(port.tx[0], 0x34, "status should be read first");
        assert_eq!(port.tx[1..], cmd, "command frame should be correct");

        Ok(())
    }

    #[test]
    fn refresh_timeout_keeps_state() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([status_frame([7, 8, 9, 10], 0x00, [0x00; 6])]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        amp.refresh()?;

        let levels = amp.levels();

        assert_eq!(
            amp.refresh(),
            Err(Error::Protocol(ProtocolError::Timeout {
                expected: 23,
                available: 0
            })),
            "result should be timeout error"
        );
        assert_eq!(amp.levels(), levels, "levels should be unchanged");
        assert_eq!(amp.input(), Some(Input::Jack), "input should be unchanged");
        assert_eq!(
            amp.sound_effect(),
            Some(SoundEffect::ThreeD),
            "sound effect should be unchanged"
        );

        Ok(())
    }

    #[test]
    fn refresh_unknown_input_keeps_state() {
        init_logger();

        let mut port = MockPort::new([status_frame([1, 1, 1, 1], 0x05, [0x00; 6])]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        assert_eq!(
            amp.refresh(),
            Err(Error::UnexpectedStatusValue),
            "result should be unexpected status value error"
        );
        assert_eq!(amp.levels(), Levels::default(), "levels should be unchanged");
    }

    #[test]
    fn refresh_invalid_frame_keeps_state() -> Result<(), Infallible> {
        init_logger();

        let valid = status_frame([7, 8, 9, 10], 0x01, [0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
        let mut bad_checksum = status_frame([20, 20, 20, 20], 0x00, [0x01; 6]);
        let mut bad_start = bad_checksum.clone();

        bad_checksum[22] ^= 0xff;
        bad_start[0] = 0x55;

        let calls = Rc::new(RefCell::new(0));
        let mut port = MockPort::new([valid, bad_checksum, bad_start]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        amp.refresh()?;

        let counter = Rc::clone(&calls);

        amp.add_on_state_callback(move || *counter.borrow_mut() += 1);

        assert!(
            matches!(
                amp.refresh(),
                Err(Error::Protocol(ProtocolError::Frame(
                    FrameError::ChecksumMismatch { .. }
                )))
            ),
            "result should be checksum mismatch error"
        );
        assert_eq!(
            amp.refresh(),
            Err(Error::Protocol(ProtocolError::Frame(FrameError::InvalidStart(0x55)))),
            "result should be invalid start error"
        );
        assert_eq!(
            amp.levels(),
            Levels {
                main: 7,
                rear: 8,
                center: 9,
                sub: 10
            },
            "levels should be unchanged"
        );
        assert_eq!(amp.input(), Some(Input::Rca), "input should be unchanged");
        assert_eq!(
            amp.sound_effect(),
            Some(SoundEffect::FourOne),
            "sound effect should be unchanged"
        );
        assert_eq!(*calls.borrow(), 0, "callbacks should not run");

        Ok(())
    }

    #[test]
    fn refresh_out_of_range_levels_keeps_state() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([
            status_frame([50, 60, 30, 30], 0x00, [0x00; 6]),
            vec![0x00],
            vec![0x00],
        ]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        assert_eq!(
            amp.refresh(),
            Err(Error::UnexpectedStatusValue),
            "result should be unexpected status value error"
        );
        assert_eq!(amp.levels(), Levels::default(), "levels should be unchanged");

        amp.step_volume(Channel::Main, false)?;
        amp.step_volume(Channel::Rear, true)?;

        assert!(amp.levels().in_range(), "levels should stay in range");
        assert_eq!(amp.levels().main, 4, "main level should be lowered");
        assert_eq!(amp.levels().rear, 31, "rear level should be raised");

        Ok(())
    }

    #[test]
    fn select_input_refreshes_effect() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([
            vec![0x00],
            status_frame([5, 30, 30, 30], 0x02, [0x00, 0x00, 0x00, 0x00, 0x00, 0x02]),
        ]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.select_input(Input::Optical1)?;

            assert_eq!(amp.input(), Some(Input::Optical1), "input should be correct");
            assert_eq!(
                amp.sound_effect(),
                Some(SoundEffect::FourOne),
                "sound effect should be read at the optical 1 offset"
            );
        }

        assert_eq!(port.tx, [0x03, 0x34], "written bytes should be correct");

        Ok(())
    }

    #[test]
    fn select_input_without_status() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([vec![0x00]]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        amp.select_input(Input::Aux)?;

        assert_eq!(amp.input(), Some(Input::Aux), "input should be set");
        assert_eq!(amp.sound_effect(), None, "sound effect should stay unknown");

        Ok(())
    }

    #[test]
    fn select_by_name() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([vec![0x00]]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.select_sound_mode("2.1")?;

            assert_eq!(
                amp.sound_effect(),
                Some(SoundEffect::TwoOne),
                "sound effect should be set"
            );
            assert_eq!(
                amp.select_source("HDMI"),
                Err(Error::InvalidArgument),
                "result should be invalid argument error"
            );
        }

        assert_eq!(port.tx, [0x16], "only the sound effect should be written");

        Ok(())
    }

    #[test]
    fn step_volume_is_clamped() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([
            status_frame([43, 0, 30, 30], 0x00, [0x00; 6]),
            vec![0x00],
            vec![0x00],
            vec![0x00],
        ]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.refresh()?;
            amp.step_volume(Channel::Main, true)?;
            amp.step_volume(Channel::Rear, false)?;
            amp.step_volume(Channel::Center, true)?;

            assert_eq!(
                amp.levels(),
                Levels {
                    main: 43,
                    rear: 0,
                    center: 31,
                    sub: 30
                },
                "levels should be stepped and clamped"
            );
        }

        assert_eq!(
            port.tx,
            [0x34, 0x08, 0x0f, 0x0c],
            "written bytes should be correct"
        );

        Ok(())
    }

    #[test]
    fn power_and_mute() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new(vec![vec![0x00]; 4]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.turn_on()?;
            amp.mute()?;

            assert_eq!(amp.power(), Some(PowerState::On), "power should be on");
            assert_eq!(amp.muted(), Some(true), "amplifier should be muted");

            amp.unmute()?;
            amp.turn_off()?;

            assert_eq!(amp.power(), Some(PowerState::Off), "power should be off");
            assert_eq!(amp.muted(), Some(false), "amplifier should be unmuted");
        }

        assert_eq!(
            port.tx,
            [0x11, 0x38, 0x39, 0x10],
            "written bytes should be correct"
        );

        Ok(())
    }

    #[test]
    fn callbacks_in_order() -> Result<(), Infallible> {
        init_logger();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut port = MockPort::new([vec![0x00]]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        for id in 0..3 {
            let calls = Rc::clone(&calls);

            amp.add_on_state_callback(move || calls.borrow_mut().push(id));
        }

        amp.turn_on()?;

        assert_eq!(*calls.borrow(), [0, 1, 2], "callbacks should run in order");

        // Failed operations do not notify
        assert!(amp.mute().is_err(), "mute should time out");
        assert_eq!(calls.borrow().len(), 3, "callbacks should not run again");

        Ok(())
    }

    #[test]
    fn control_volume_unmutes() {
        init_logger();

        let calls = Rc::new(RefCell::new(0));
        let mut port = MockPort::new([vec![0x00], vec![0x00]]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());
            let counter = Rc::clone(&calls);

            amp.add_on_state_callback(move || *counter.borrow_mut() += 1);

            assert!(amp.control(Call::VolumeDown), "command should succeed");
            assert_eq!(amp.levels().main, 4, "main level should be lowered");
            assert_eq!(amp.muted(), Some(false), "amplifier should be unmuted");
        }

        assert_eq!(port.tx, [0x09, 0x39], "written bytes should be correct");
        assert_eq!(*calls.borrow(), 1, "callbacks should run once per command");
    }

    #[test]
    fn control_failure_is_reported() {
        init_logger();

        let mut port = MockPort::new([]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        assert!(!amp.control(Call::TurnOn), "command should fail");
        assert!(
            !amp.control(Call::SelectSoundMode("Stereo")),
            "unknown name should fail"
        );
        assert_eq!(amp.power(), None, "power should be unchanged");
        assert_eq!(amp.features(), Features::all(), "all features should be supported");
    }

    #[test]
    fn source_lists() {
        let mut port = MockPort::new([]);
        let amp = Amplifier::new(&mut port, MockClock::default());

        assert_eq!(
            amp.sources(),
            ["3.5 mm", "RCA", "Optical 1", "Optical 2", "Coaxial", "Aux"],
            "sources should be correct"
        );
        assert_eq!(
            amp.sound_modes(),
            ["3D", "2.1", "4.1", "Default"],
            "sound modes should be correct"
        );
    }

    #[test]
    fn query_properties() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new([
            FRAME.to_vec(),
            FRAME.to_vec(),
            vec![0xaa, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x00, 0x2a, 0x00, 0x00],
        ]);
        let mut amp = Amplifier::new(&mut port, MockClock::default());

        assert_eq!(
            amp.query_property(&PROP_FIRMWARE_VERSION)?,
            Value::Number(123),
            "firmware version should be correct"
        );
        assert_eq!(
            amp.query_property(&PROP_SOUND_EFFECT)?,
            Value::String("3D".to_string()),
            "sound effect should be correct"
        );
        assert_eq!(
            amp.query_property(&PROP_TEMPERATURE)?,
            Value::Number(0x2a),
            "temperature should be correct"
        );

        Ok(())
    }

    #[test]
    fn maintenance_commands() -> Result<(), Infallible> {
        init_logger();

        let mut port = MockPort::new(vec![vec![0x00]; 4]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.save_settings()?;
            amp.block_inputs(true)?;
            amp.block_inputs(false)?;
            amp.reset_power_up_time()?;
        }

        assert_eq!(
            port.tx,
            [0x36, 0x22, 0x33, 0x30],
            "written bytes should be correct"
        );

        Ok(())
    }

    #[test]
    fn set_volume_uses_fresh_status() -> Result<(), Infallible> {
        init_logger();

        // Status changed on the device since the last refresh
        let fresh = status_frame([12, 30, 30, 30], 0x03, [0x01; 6]);
        let mut port = MockPort::new([fresh.clone(), vec![0x00; 5]]);

        {
            let mut amp = Amplifier::new(&mut port, MockClock::default());

            amp.set_volume(Channel::Center, 0.0)?;
        }

        let mut cmd = fresh;

        cmd[5] = 0;
        cmd[22] = frame::compute_checksum(&cmd);

        assert_eq!(port.tx[1..], cmd, "command frame should be based on fresh status");

        Ok(())
    }
}
