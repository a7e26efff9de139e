use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    bus::Bus,
    controller::{create_controller, Controller, ControllerType},
    error::StateError,
    host::{HostPointer, PointerSource},
    state::StateWrapper,
    types::PhysicalMemoryAddress,
};

pub const STATE_MAGIC: u32 = 0x4D45_5350; // "PSEM"
pub const STATE_VERSION: u32 = 1;

pub struct System {
    pub bus: Bus,
    pub controller: Option<Box<dyn Controller>>,
    pointer: Rc<HostPointer>,
}

impl System {
    pub fn new(bus: Bus, controller_type: ControllerType, pointer: Rc<HostPointer>) -> Self {
        tracing::info!("Initializing system with controller: {}", controller_type);
        let source: Rc<dyn PointerSource> = pointer.clone();
        Self {
            bus,
            controller: create_controller(controller_type, source),
            pointer,
        }
    }

    pub fn controller_type(&self) -> ControllerType {
        self.controller
            .as_ref()
            .map(|controller| controller.controller_type())
            .unwrap_or(ControllerType::None)
    }

    pub fn pointer(&self) -> Rc<HostPointer> {
        self.pointer.clone()
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        if let Some(controller) = &mut self.controller {
            controller.reset();
        }
    }

    pub fn set_pointer_position(&mut self, x: i32, y: i32) {
        self.pointer.set_position(x, y);
    }

    pub fn set_button_state(&mut self, button_code: i32, pressed: bool) {
        if let Some(controller) = &mut self.controller {
            controller.set_button_state_code(button_code, pressed);
        }
    }

    /// One serial transfer with the port-1 device. An empty port never acks
    /// and floats high.
    pub fn controller_transfer(&mut self, data_in: u8) -> (bool, u8) {
        match &mut self.controller {
            Some(controller) => controller.transfer(data_in),
            None => (false, 0xFF),
        }
    }

    pub fn controller_deselect(&mut self) {
        if let Some(controller) = &mut self.controller {
            controller.reset_transfer_state();
        }
    }

    pub fn read_byte(&mut self, address: PhysicalMemoryAddress) -> u8 {
        self.bus.read_byte(address, address)
    }

    pub fn read_halfword(&mut self, address: PhysicalMemoryAddress) -> u16 {
        self.bus.read_halfword(address, address)
    }

    pub fn read_word(&mut self, address: PhysicalMemoryAddress) -> u32 {
        self.bus.read_word(address, address)
    }

    pub fn write_byte(&mut self, address: PhysicalMemoryAddress, value: u8) {
        self.bus.write_byte(address, address, value);
    }

    pub fn write_halfword(&mut self, address: PhysicalMemoryAddress, value: u16) {
        self.bus.write_halfword(address, address, value);
    }

    pub fn write_word(&mut self, address: PhysicalMemoryAddress, value: u32) {
        self.bus.write_word(address, address, value);
    }

    pub fn save_state(&mut self) -> Result<Vec<u8>, StateError> {
        let mut sw = StateWrapper::writer();
        self.do_header(&mut sw)?;
        do_body(&mut self.bus, &mut self.controller, &mut sw, true)?;
        Ok(sw.into_bytes())
    }

    /// Restores a state produced by [`System::save_state`]. Controller input
    /// (buttons, motion) is only taken from the state when
    /// `apply_input_state` is set, so replay can run without clobbering a
    /// live device.
    ///
    /// The state is read into a copy of the bus and controller, which replaces
    /// the live ones only once the whole stream has been consumed. On error
    /// the system is left as it was.
    pub fn load_state(&mut self, data: &[u8], apply_input_state: bool) -> Result<(), StateError> {
        let mut sw = StateWrapper::reader(data);
        self.do_header(&mut sw)?;

        let mut bus = self.bus.clone();
        let mut controller = self.controller.as_ref().map(|controller| controller.box_clone());
        do_body(&mut bus, &mut controller, &mut sw, apply_input_state)?;
        if sw.remaining() != 0 {
            return Err(StateError::TrailingData(sw.remaining()));
        }

        self.bus = bus;
        self.controller = controller;
        tracing::debug!("[SYSTEM] Loaded state ({} bytes)", data.len());
        Ok(())
    }

    /// Magic, version and attached controller type. Nothing past the header
    /// is read unless all three match.
    fn do_header(&self, sw: &mut StateWrapper) -> Result<(), StateError> {
        let mut magic = STATE_MAGIC;
        sw.do_value(&mut magic)?;
        if magic != STATE_MAGIC {
            return Err(StateError::BadMagic(magic));
        }

        let mut version = STATE_VERSION;
        sw.do_value(&mut version)?;
        if version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(version));
        }

        let attached = self.controller_type();
        let mut controller_type = attached.to_u8();
        sw.do_value(&mut controller_type)?;
        let saved = ControllerType::from_u8(controller_type).ok_or(StateError::InvalidValue {
            field: "controller_type",
            value: controller_type as u32,
        })?;
        if saved != attached {
            return Err(StateError::ControllerMismatch { saved, attached });
        }

        Ok(())
    }
}

fn do_body(
    bus: &mut Bus,
    controller: &mut Option<Box<dyn Controller>>,
    sw: &mut StateWrapper,
    apply_input_state: bool,
) -> Result<(), StateError> {
    bus.do_state(sw)?;
    if let Some(controller) = controller {
        controller.do_state(sw, apply_input_state)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub bios_path: Option<PathBuf>,
    pub controller: ControllerType,
    pub log_filter: Option<String>,
}

impl SystemConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid system configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[derive(Default)]
pub struct SystemBuilder {
    bios_path: Option<PathBuf>,
    bios_image: Option<Vec<u8>>,
    controller: ControllerType,
    pointer: Option<Rc<HostPointer>>,
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        let mut builder = Self::new();
        if let Some(path) = &config.bios_path {
            builder.bios_path(path);
        }
        builder.controller(config.controller);
        builder
    }

    pub fn bios_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.bios_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn bios_image(&mut self, image: &[u8]) -> &mut Self {
        self.bios_image = Some(image.to_vec());
        self
    }

    pub fn controller(&mut self, controller: ControllerType) -> &mut Self {
        self.controller = controller;
        self
    }

    pub fn pointer(&mut self, pointer: Rc<HostPointer>) -> &mut Self {
        self.pointer = Some(pointer);
        self
    }

    pub fn build(&self) -> anyhow::Result<System> {
        let mut bus = Bus::new();
        match (&self.bios_image, &self.bios_path) {
            (Some(image), _) => bus
                .load_bios_image(image)
                .context("failed to load BIOS image")?,
            (None, Some(path)) => bus
                .load_bios(path)
                .with_context(|| format!("failed to load BIOS from {}", path.display()))?,
            (None, None) => anyhow::bail!("SystemBuilder: no BIOS image or path given"),
        }

        let pointer = self.pointer.clone().unwrap_or_default();
        Ok(System::new(bus, self.controller, pointer))
    }
}
