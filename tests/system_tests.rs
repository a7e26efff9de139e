mod common;

use std::rc::Rc;

use common::{bios_image, write_temp_file};
use psxcore::{
    create_system, logging, memory::BIOS_BASE, Button, ControllerType, HostPointer, StateError,
    System, SystemBuilder, SystemConfig,
};

fn mouse_system() -> (Rc<HostPointer>, System) {
    let pointer = Rc::new(HostPointer::default());
    let system = SystemBuilder::new()
        .bios_image(&bios_image())
        .controller(ControllerType::PlayStationMouse)
        .pointer(pointer.clone())
        .build()
        .unwrap();
    (pointer, system)
}

fn poll(system: &mut System, bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .map(|&byte| system.controller_transfer(byte).1)
        .collect()
}

#[test]
fn test_build_from_config_file() {
    let bios = write_temp_file("config-bios.bin", &bios_image());
    let config_path = write_temp_file(
        "config.json",
        format!(
            r#"{{"bios_path": {:?}, "controller": "PlayStationMouse"}}"#,
            bios.display().to_string()
        )
        .as_bytes(),
    );

    let config = SystemConfig::load(&config_path).unwrap();
    let mut system = SystemBuilder::from_config(&config).build().unwrap();

    assert!(system.bus.is_initialized());
    assert_eq!(system.controller_type(), ControllerType::PlayStationMouse);
    assert_eq!(system.read_word(BIOS_BASE + 0x6F14), 0xAF81_A9C0);

    std::fs::remove_file(bios).unwrap();
    std::fs::remove_file(config_path).unwrap();
}

#[test]
fn test_create_system_with_log_filter() {
    let bios = write_temp_file("create-bios.bin", &bios_image());
    let config = SystemConfig {
        bios_path: Some(bios.clone()),
        controller: ControllerType::PlayStationMouse,
        log_filter: Some("psxcore=debug".to_string()),
    };

    let mut system = create_system(&config).unwrap();
    assert_eq!(system.controller_type(), ControllerType::PlayStationMouse);
    assert_eq!(system.read_word(BIOS_BASE + 0x6F0C), 0x2401_0001);

    // the test harness subscriber is already installed
    assert!(!logging::init(Some("debug")));

    std::fs::remove_file(bios).unwrap();
}

#[test]
fn test_create_system_without_bios_fails() {
    let config = SystemConfig {
        log_filter: Some("warn".to_string()),
        ..SystemConfig::default()
    };
    assert!(create_system(&config).is_err());
}

#[test]
fn test_build_fails_on_bad_bios() {
    let bios = write_temp_file("bad-bios.bin", &[0u8; 16]);
    let result = SystemBuilder::new().bios_path(&bios).build();

    let err = result.err().unwrap();
    assert!(format!("{:#}", err).contains("BIOS image mismatch"));

    std::fs::remove_file(bios).unwrap();
}

#[test]
fn test_ram_survives_save_and_load() {
    let (_, mut system) = mouse_system();
    system.write_word(0x0000_1000, 0x1122_3344);
    system.write_byte(0x001F_FFFF, 0x99);
    system.write_word(0x1F80_1080 + 0x20, 0x0000_4000);

    let state = system.save_state().unwrap();

    system.reset();
    assert_eq!(system.read_word(0x0000_1000), 0);
    assert_eq!(system.read_word(0x1F80_10A0), 0);

    system.load_state(&state, true).unwrap();
    assert_eq!(system.read_word(0x0000_1000), 0x1122_3344);
    assert_eq!(system.read_byte(0x001F_FFFF), 0x99);
    assert_eq!(system.read_word(0x1F80_10A0), 0x0000_4000);
}

#[test]
fn test_controller_state_follows_input_flag() {
    let (pointer, mut system) = mouse_system();
    system.set_button_state(Button::Left.code(), true);
    pointer.move_by(4, 4);
    for byte in [0x01, 0x42, 0, 0, 0, 0, 0] {
        system.controller_transfer(byte);
    }
    system.controller_transfer(0x01);
    let state = system.save_state().unwrap();

    system.controller_deselect();
    system.set_button_state(Button::Left.code(), false);

    system.load_state(&state, false).unwrap();
    let data = poll(&mut system, &[0x42, 0, 0, 0]);
    assert_eq!(data, vec![0x12, 0x5A, 0xFF, 0xFF]);

    system.controller_deselect();
    system.load_state(&state, true).unwrap();
    let data = poll(&mut system, &[0x42, 0, 0, 0]);
    assert_eq!(data, vec![0x12, 0x5A, 0xFF, 0xF7]);
}

#[test]
fn test_load_rejects_corrupt_state() {
    let (_, mut system) = mouse_system();
    let state = system.save_state().unwrap();

    let mut bad_magic = state.clone();
    bad_magic[0] ^= 0xFF;
    assert!(matches!(
        system.load_state(&bad_magic, true),
        Err(StateError::BadMagic(_))
    ));

    let mut bad_version = state.clone();
    bad_version[4] = 0x7F;
    assert_eq!(
        system.load_state(&bad_version, true),
        Err(StateError::UnsupportedVersion(0x7F))
    );

    let truncated = &state[..state.len() - 1];
    assert!(matches!(
        system.load_state(truncated, true),
        Err(StateError::UnexpectedEnd { .. })
    ));

    let mut trailing = state.clone();
    trailing.push(0);
    assert_eq!(
        system.load_state(&trailing, true),
        Err(StateError::TrailingData(1))
    );
}

#[test]
fn test_load_rejects_other_controller() {
    let (_, mut with_mouse) = mouse_system();
    let state = with_mouse.save_state().unwrap();

    let mut without_mouse = SystemBuilder::new()
        .bios_image(&bios_image())
        .build()
        .unwrap();
    assert_eq!(
        without_mouse.load_state(&state, true),
        Err(StateError::ControllerMismatch {
            saved: ControllerType::PlayStationMouse,
            attached: ControllerType::None,
        })
    );
}

#[test]
fn test_rejected_load_leaves_system_untouched() {
    let (_, mut with_mouse) = mouse_system();
    with_mouse.write_word(0x1000, 0xAAAA_AAAA);
    let state = with_mouse.save_state().unwrap();

    let mut without_mouse = SystemBuilder::new()
        .bios_image(&bios_image())
        .build()
        .unwrap();
    without_mouse.write_word(0x1000, 0x1234_5678);

    assert!(matches!(
        without_mouse.load_state(&state, true),
        Err(StateError::ControllerMismatch { .. })
    ));
    assert_eq!(without_mouse.read_word(0x1000), 0x1234_5678);
}

#[test]
fn test_failed_load_leaves_ram_and_controller_untouched() {
    let (_, mut system) = mouse_system();
    system.write_word(0x2000, 0xBBBB_BBBB);
    system.write_word(0x1F80_10A0, 0x0000_4000);
    system.set_button_state(Button::Left.code(), true);
    system.controller_transfer(0x01);
    let state = system.save_state().unwrap();

    system.controller_deselect();
    system.set_button_state(Button::Left.code(), false);
    system.write_word(0x2000, 0x1111_1111);
    system.write_word(0x1F80_10A0, 0);

    let truncated = &state[..state.len() - 1];
    let mut bad_transfer_state = state.clone();
    *bad_transfer_state.last_mut().unwrap() = 0x7F;
    let mut trailing = state.clone();
    trailing.extend_from_slice(&[0, 0]);

    assert!(matches!(
        system.load_state(truncated, true),
        Err(StateError::UnexpectedEnd { .. })
    ));
    assert_eq!(
        system.load_state(&bad_transfer_state, true),
        Err(StateError::InvalidValue {
            field: "transfer_state",
            value: 0x7F
        })
    );
    assert_eq!(
        system.load_state(&trailing, true),
        Err(StateError::TrailingData(2))
    );

    assert_eq!(system.read_word(0x2000), 0x1111_1111);
    assert_eq!(system.read_word(0x1F80_10A0), 0);
    // still idle with the button released: no exchange in progress
    assert_eq!(system.controller_transfer(0x42), (false, 0xFF));
    let data = poll(&mut system, &[0x01, 0x42, 0, 0, 0]);
    assert_eq!(data, vec![0xFF, 0x12, 0x5A, 0xFF, 0xFF]);
}
