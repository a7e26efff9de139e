use std::{fmt, rc::Rc, str::FromStr};

use derivative::Derivative;

use crate::{
    controller::{Controller, ControllerType},
    error::{InputError, StateError},
    host::PointerSource,
    state::StateWrapper,
    types::{truncate8, zero_extend32_u8},
};

const ID: u16 = 0x5A12;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Button {
    Left,
    Right,
}

impl Button {
    pub const COUNT: usize = 2;
    pub const ALL: [Button; Button::COUNT] = [Button::Left, Button::Right];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Bit in the active-low button mask.
    fn bit(self) -> u16 {
        match self {
            Button::Left => 11,
            Button::Right => 10,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Left => write!(f, "Left"),
            Button::Right => write!(f, "Right"),
        }
    }
}

impl FromStr for Button {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|button| button.to_string() == s)
            .ok_or_else(|| InputError::UnknownButton(s.to_string()))
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TransferState {
    #[default]
    Idle,
    Ready,
    IDMSB,
    ButtonsLSB,
    ButtonsMSB,
    DeltaX,
    DeltaY,
}

impl TransferState {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => TransferState::Idle,
            1 => TransferState::Ready,
            2 => TransferState::IDMSB,
            3 => TransferState::ButtonsLSB,
            4 => TransferState::ButtonsMSB,
            5 => TransferState::DeltaX,
            6 => TransferState::DeltaY,
            _ => return None,
        })
    }
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct PlayStationMouse {
    #[derivative(Debug = "ignore")]
    pointer: Rc<dyn PointerSource>,

    last_host_position_x: i32,
    last_host_position_y: i32,

    button_state: u16,
    delta_x: i8,
    delta_y: i8,

    transfer_state: TransferState,
}

impl PlayStationMouse {
    pub fn new(pointer: Rc<dyn PointerSource>) -> Self {
        let (x, y) = pointer.pointer_position();
        Self {
            pointer,
            last_host_position_x: x,
            last_host_position_y: y,
            button_state: 0xFFFF,
            delta_x: 0,
            delta_y: 0,
            transfer_state: TransferState::Idle,
        }
    }

    pub fn static_vibration_motor_count() -> u32 {
        0
    }

    pub fn button_names() -> Vec<(String, i32)> {
        Button::ALL
            .iter()
            .map(|button| (button.to_string(), button.code()))
            .collect()
    }

    pub fn button_code_by_name(name: &str) -> Option<i32> {
        name.parse::<Button>().ok().map(Button::code)
    }

    pub fn button_state(&self) -> u16 {
        self.button_state
    }

    pub fn delta_x(&self) -> i8 {
        self.delta_x
    }

    pub fn delta_y(&self) -> i8 {
        self.delta_y
    }

    pub fn transfer_state(&self) -> TransferState {
        self.transfer_state
    }

    pub fn set_button_state(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.button_state &= !(1 << button.bit());
        } else {
            self.button_state |= 1 << button.bit();
        }
        tracing::trace!(
            "[MOUSE] {} {} - buttons {:016b}",
            button,
            if pressed { "pressed" } else { "released" },
            self.button_state
        );
    }

    fn update_position(&mut self) {
        let (mouse_x, mouse_y) = self.pointer.pointer_position();
        let delta_x = mouse_x.wrapping_sub(self.last_host_position_x);
        let delta_y = mouse_y.wrapping_sub(self.last_host_position_y);
        self.last_host_position_x = mouse_x;
        self.last_host_position_y = mouse_y;

        self.delta_x = delta_x.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
        self.delta_y = delta_y.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
    }
}

impl Controller for PlayStationMouse {
    fn controller_type(&self) -> ControllerType {
        ControllerType::PlayStationMouse
    }

    fn box_clone(&self) -> Box<dyn Controller> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.transfer_state = TransferState::Idle;
    }

    fn reset_transfer_state(&mut self) {
        self.transfer_state = TransferState::Idle;
    }

    fn transfer(&mut self, data_in: u8) -> (bool, u8) {
        match self.transfer_state {
            TransferState::Idle => {
                if data_in == 0x01 {
                    self.transfer_state = TransferState::Ready;
                    return (true, 0xFF);
                }
                (false, 0xFF)
            }
            TransferState::Ready => {
                if data_in == 0x42 {
                    self.transfer_state = TransferState::IDMSB;
                    return (true, truncate8(ID as u32));
                }
                tracing::trace!("[MOUSE] Unknown command {:02X}", data_in);
                self.transfer_state = TransferState::Idle;
                (false, 0xFF)
            }
            TransferState::IDMSB => {
                self.transfer_state = TransferState::ButtonsLSB;
                (true, truncate8((ID >> 8) as u32))
            }
            TransferState::ButtonsLSB => {
                self.transfer_state = TransferState::ButtonsMSB;
                (true, truncate8(self.button_state as u32))
            }
            TransferState::ButtonsMSB => {
                self.transfer_state = TransferState::DeltaX;
                (true, truncate8((self.button_state >> 8) as u32))
            }
            TransferState::DeltaX => {
                self.update_position();
                self.transfer_state = TransferState::DeltaY;
                (true, self.delta_x as u8)
            }
            TransferState::DeltaY => {
                self.transfer_state = TransferState::Idle;
                (false, self.delta_y as u8)
            }
        }
    }

    fn do_state(&mut self, sw: &mut StateWrapper, apply_input_state: bool) -> Result<(), StateError> {
        let mut button_state = self.button_state;
        let mut delta_x = self.delta_x as u8;
        let mut delta_y = self.delta_y as u8;
        sw.do_value(&mut button_state)?;
        sw.do_value(&mut delta_x)?;
        sw.do_value(&mut delta_y)?;
        if apply_input_state {
            self.button_state = button_state;
            self.delta_x = delta_x as i8;
            self.delta_y = delta_y as i8;
        }

        let mut transfer_state = self.transfer_state as u8;
        sw.do_value(&mut transfer_state)?;
        self.transfer_state =
            TransferState::from_u8(transfer_state).ok_or(StateError::InvalidValue {
                field: "transfer_state",
                value: zero_extend32_u8(transfer_state),
            })?;

        Ok(())
    }

    fn set_button_state_code(&mut self, button_code: i32, pressed: bool) {
        if let Some(button) = Button::from_code(button_code) {
            self.set_button_state(button, pressed);
        }
    }

    fn vibration_motor_count(&self) -> u32 {
        Self::static_vibration_motor_count()
    }
}
