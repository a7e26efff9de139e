pub mod bus;
pub mod controller;
pub mod dma;
pub mod error;
pub mod host;
pub mod logging;
pub mod memory;
pub mod mouse;
pub mod state;
pub mod system;
pub mod types;

pub use bus::{Bus, Region};
pub use controller::{Controller, ControllerType};
pub use error::{BiosError, InputError, StateError};
pub use host::{HostPointer, PointerSource};
pub use mouse::{Button, PlayStationMouse, TransferState};
pub use state::StateWrapper;
pub use system::{System, SystemBuilder, SystemConfig};
pub use types::{MemoryAccessSize, MemoryAccessType, PhysicalMemoryAddress};
use wasm_bindgen::prelude::*;

/// Builds a system from a configuration, installing the native log
/// subscriber first so BIOS load failures are reported.
pub fn create_system(config: &SystemConfig) -> anyhow::Result<System> {
    logging::init(config.log_filter.as_deref());
    SystemBuilder::from_config(config).build()
}

#[wasm_bindgen(js_name = System)]
pub struct JsSystem(System);

#[wasm_bindgen(js_class = System)]
impl JsSystem {
    #[wasm_bindgen(constructor)]
    pub fn new(bios: &[u8], mouse: bool) -> Result<JsSystem, JsError> {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();

        let controller = if mouse {
            ControllerType::PlayStationMouse
        } else {
            ControllerType::None
        };
        let system = SystemBuilder::new()
            .bios_image(bios)
            .controller(controller)
            .build()
            .map_err(|err| JsError::new(&format!("{:#}", err)))?;

        Ok(Self(system))
    }

    #[wasm_bindgen(js_name = setPointerPosition)]
    pub fn set_pointer_position(&mut self, x: i32, y: i32) {
        self.0.set_pointer_position(x, y);
    }

    #[wasm_bindgen(js_name = setButtonState)]
    pub fn set_button_state(&mut self, button_code: i32, pressed: bool) {
        self.0.set_button_state(button_code, pressed);
    }

    /// Returns the output byte in bits 0-7 and the ack flag in bit 8.
    pub fn transfer(&mut self, data_in: u8) -> u16 {
        let (ack, data_out) = self.0.controller_transfer(data_in);
        ((ack as u16) << 8) | data_out as u16
    }

    #[wasm_bindgen(js_name = readWord)]
    pub fn read_word(&mut self, address: u32) -> u32 {
        self.0.read_word(address)
    }

    #[wasm_bindgen(js_name = writeWord)]
    pub fn write_word(&mut self, address: u32, value: u32) {
        self.0.write_word(address, value);
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }

    #[wasm_bindgen(js_name = saveState)]
    pub fn save_state(&mut self) -> Result<Vec<u8>, JsError> {
        Ok(self.0.save_state()?)
    }

    #[wasm_bindgen(js_name = loadState)]
    pub fn load_state(&mut self, data: &[u8], apply_input_state: bool) -> Result<(), JsError> {
        Ok(self.0.load_state(data, apply_input_state)?)
    }
}
