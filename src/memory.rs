use derivative::Derivative;
use tracing::trace;

use crate::types::MemoryAccessSize;

// +-------------------------+-----------+------------------------------------+
// | Range                   | Region    | Description                        |
// +-------------------------+-----------+------------------------------------+
// | 0x00000000 - 0x007FFFFF | RAM       | 2 MiB main RAM, mirrored 4 times   |
// | 0x1F801080 - 0x1F8010FF | DMA       | DMA controller registers           |
// | 0x1F801C00 - 0x1F801FFF | SPU       | Sound processor registers          |
// | 0x1F802000 - 0x1F803FFF | EXP2      | Expansion region 2 (debug TTY)     |
// | 0x1FC00000 - 0x1FC7FFFF | BIOS      | 512 KiB BIOS ROM                   |
// +-------------------------+-----------+------------------------------------+
pub const RAM_BASE: u32 = 0x0000_0000;
pub const RAM_SIZE: usize = 0x20_0000;
pub const RAM_MASK: u32 = RAM_SIZE as u32 - 1;
pub const RAM_MIRROR_END: u32 = 0x0080_0000;

pub const DMA_BASE: u32 = 0x1F80_1080;
pub const DMA_SIZE: u32 = 0x80;
pub const DMA_MASK: u32 = DMA_SIZE - 1;

pub const SPU_BASE: u32 = 0x1F80_1C00;
pub const SPU_SIZE: u32 = 0x400;
pub const SPU_MASK: u32 = SPU_SIZE - 1;

pub const EXP2_BASE: u32 = 0x1F80_2000;
pub const EXP2_SIZE: u32 = 0x2000;
pub const EXP2_MASK: u32 = EXP2_SIZE - 1;

pub const BIOS_BASE: u32 = 0x1FC0_0000;
pub const BIOS_SIZE: usize = 0x8_0000;
pub const BIOS_MASK: u32 = BIOS_SIZE as u32 - 1;

/// Fixed-size backing store addressed through a power-of-two mask.
#[derive(Derivative, Clone)]
#[derivative(Debug, PartialEq)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub mask: u32,
    #[derivative(Debug = "ignore")]
    pub data: Vec<u8>,
}

impl MemoryRegion {
    pub fn new(name: &'static str, size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            name,
            mask: size as u32 - 1,
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Little-endian read of `size` bytes starting at the masked offset.
    /// Bytes that run past the end wrap back to the start of the region.
    pub fn read(&self, size: MemoryAccessSize, offset: u32) -> u32 {
        let mut value = 0u32;
        for i in 0..size.bytes() {
            let address = (offset.wrapping_add(i as u32) & self.mask) as usize;
            value |= (self.data[address] as u32) << (i * 8);
        }
        value
    }

    pub fn write(&mut self, size: MemoryAccessSize, offset: u32, value: u32) {
        for i in 0..size.bytes() {
            let address = (offset.wrapping_add(i as u32) & self.mask) as usize;
            self.data[address] = (value >> (i * 8)) as u8;
        }
    }

    pub fn read_byte(&self, offset: u32) -> u8 {
        self.data[(offset & self.mask) as usize]
    }

    pub fn read_word(&self, offset: u32) -> u32 {
        self.read(MemoryAccessSize::Word, offset)
    }

    pub fn load(&mut self, offset: u32, data: &[u8]) {
        let start = (offset & self.mask) as usize;
        let end = start + data.len();
        trace!(
            "[MEM] Loading {} bytes into {} at {:#08X}",
            data.len(),
            self.name,
            start
        );
        self.data[start..end].copy_from_slice(data);
    }
}

/// RAM and BIOS storage owned by the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub ram: MemoryRegion,
    pub bios: MemoryRegion,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.ram.fill(0);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            ram: MemoryRegion::new("RAM", RAM_SIZE),
            bios: MemoryRegion::new("BIOS", BIOS_SIZE),
        }
    }
}
