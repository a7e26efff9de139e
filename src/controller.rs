use std::{fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{error::StateError, host::PointerSource, mouse::PlayStationMouse, state::StateWrapper};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ControllerType {
    #[default]
    None,
    PlayStationMouse,
}

impl ControllerType {
    pub fn to_u8(self) -> u8 {
        match self {
            ControllerType::None => 0,
            ControllerType::PlayStationMouse => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ControllerType::None),
            1 => Some(ControllerType::PlayStationMouse),
            _ => None,
        }
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerType::None => write!(f, "None"),
            ControllerType::PlayStationMouse => write!(f, "PlayStationMouse"),
        }
    }
}

/// Capability set every device attached to a controller port implements.
pub trait Controller {
    fn controller_type(&self) -> ControllerType;

    fn reset(&mut self);

    /// Abandons the exchange in progress, e.g. when the port is deselected.
    fn reset_transfer_state(&mut self);

    /// Exchanges one byte with the device. Returns `(ack, data_out)`; `ack` is
    /// false on the last byte of an exchange.
    fn transfer(&mut self, data_in: u8) -> (bool, u8);

    /// Saves or restores the device. Fields that reflect live input are only
    /// restored when `apply_input_state` is set.
    fn do_state(&mut self, sw: &mut StateWrapper, apply_input_state: bool) -> Result<(), StateError>;

    /// Sets a button by its numeric code. Unknown codes are ignored.
    fn set_button_state_code(&mut self, button_code: i32, pressed: bool);

    fn vibration_motor_count(&self) -> u32 {
        0
    }

    /// Independent copy of the device, used to stage a state load.
    fn box_clone(&self) -> Box<dyn Controller>;
}

pub fn create_controller(
    controller_type: ControllerType,
    pointer: Rc<dyn PointerSource>,
) -> Option<Box<dyn Controller>> {
    match controller_type {
        ControllerType::None => None,
        ControllerType::PlayStationMouse => Some(Box::new(PlayStationMouse::new(pointer))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostPointer;

    #[test]
    fn test_controller_type_codes() {
        for ty in [ControllerType::None, ControllerType::PlayStationMouse] {
            assert_eq!(ControllerType::from_u8(ty.to_u8()), Some(ty));
        }
        assert_eq!(ControllerType::from_u8(7), None);
    }

    #[test]
    fn test_factory() {
        let pointer = Rc::new(HostPointer::default());
        assert!(create_controller(ControllerType::None, pointer.clone()).is_none());

        let mouse = create_controller(ControllerType::PlayStationMouse, pointer).unwrap();
        assert_eq!(mouse.controller_type(), ControllerType::PlayStationMouse);
        assert_eq!(mouse.vibration_motor_count(), 0);
    }

    #[test]
    fn test_config_names() {
        let ty: ControllerType = serde_json::from_str("\"PlayStationMouse\"").unwrap();
        assert_eq!(ty, ControllerType::PlayStationMouse);
        assert_eq!(ty.to_string(), "PlayStationMouse");
    }
}
