use std::{
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

use tracing::{error, info, trace, warn};

use crate::{
    dma::Dma,
    error::{BiosError, StateError},
    memory::{
        Memory, BIOS_BASE, BIOS_MASK, BIOS_SIZE, DMA_BASE, DMA_MASK, DMA_SIZE, EXP2_BASE,
        EXP2_MASK, EXP2_SIZE, RAM_MASK, RAM_MIRROR_END, SPU_BASE, SPU_MASK, SPU_SIZE,
    },
    state::StateWrapper,
    types::{
        truncate16, truncate8, zero_extend32_u16, zero_extend32_u8, MemoryAccessSize,
        MemoryAccessType, PhysicalMemoryAddress,
    },
};

/// Firmware words replaced after every BIOS load. They force the BIOS TTY
/// flag on so its debug console writes reach expansion region 2.
pub const BIOS_PATCHES: [(u32, u32); 2] = [
    (0x6F0C, 0x2401_0001), // addiu $at, $zero, 1
    (0x6F14, 0xAF81_A9C0), // sw at, -0x5640(gp)
];

const EXP2_STATUS: u32 = 0x21;
const EXP2_TTY: u32 = 0x23;
const EXP2_POST: u32 = 0x41;

const SPU_STATUS: u32 = 0x1AE;
const SPU_TRANSFER_FIFO: u32 = 0x1A8;
const SPU_CONTROL: u32 = 0x1AA;

/// The closed set of regions decoded by the bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Region {
    Ram,
    Bios,
    Exp2,
    Spu,
    Dma,
}

impl Region {
    /// Decodes a physical address. Checks run in a fixed priority order.
    pub fn decode(address: PhysicalMemoryAddress) -> Option<Region> {
        if address < RAM_MIRROR_END {
            Some(Region::Ram)
        } else if (BIOS_BASE..BIOS_BASE + BIOS_SIZE as u32).contains(&address) {
            Some(Region::Bios)
        } else if (EXP2_BASE..EXP2_BASE + EXP2_SIZE).contains(&address) {
            Some(Region::Exp2)
        } else if (SPU_BASE..SPU_BASE + SPU_SIZE).contains(&address) {
            Some(Region::Spu)
        } else if (DMA_BASE..DMA_BASE + DMA_SIZE).contains(&address) {
            Some(Region::Dma)
        } else {
            None
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Ram => write!(f, "RAM"),
            Region::Bios => write!(f, "BIOS"),
            Region::Exp2 => write!(f, "EXP2"),
            Region::Spu => write!(f, "SPU"),
            Region::Dma => write!(f, "DMA"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bus {
    pub memory: Memory,
    pub dma: Dma,

    tty_line_buffer: Vec<u8>,
    initialized: bool,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and patches the BIOS from `path`. The bus must not be used to
    /// run guest code unless this succeeds.
    pub fn load_bios(&mut self, path: impl AsRef<Path>) -> Result<(), BiosError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| BiosError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let size = file.metadata().map_err(BiosError::ShortRead)?.len();
        if size != BIOS_SIZE as u64 {
            error!(
                "BIOS image mismatch, expecting {} bytes, got {} bytes",
                BIOS_SIZE, size
            );
            return Err(BiosError::SizeMismatch {
                expected: BIOS_SIZE,
                actual: size,
            });
        }

        let mut image = vec![0u8; BIOS_SIZE];
        if let Err(err) = file.read_exact(&mut image) {
            error!("Failed to read BIOS image: {}", err);
            return Err(BiosError::ShortRead(err));
        }

        info!("[BUS] Loaded BIOS from {}", path.display());
        self.install_bios(&image);
        Ok(())
    }

    pub fn load_bios_image(&mut self, image: &[u8]) -> Result<(), BiosError> {
        if image.len() != BIOS_SIZE {
            error!(
                "BIOS image mismatch, expecting {} bytes, got {} bytes",
                BIOS_SIZE,
                image.len()
            );
            return Err(BiosError::SizeMismatch {
                expected: BIOS_SIZE,
                actual: image.len() as u64,
            });
        }

        self.install_bios(image);
        Ok(())
    }

    fn install_bios(&mut self, image: &[u8]) {
        self.memory.bios.load(0, image);
        for (offset, value) in BIOS_PATCHES {
            self.memory
                .bios
                .write(MemoryAccessSize::Word, offset, value);
        }
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.memory.reset();
        self.dma.reset();
        self.tty_line_buffer.clear();
    }

    /// Raw TTY bytes not yet terminated by a newline.
    pub fn tty_line_buffer(&self) -> &[u8] {
        &self.tty_line_buffer
    }

    /// Saves or restores RAM and the DMA registers. The BIOS is not part of
    /// the state; it is reloaded and patched from its image.
    pub fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        sw.do_bytes(&mut self.memory.ram.data)?;
        self.dma.do_state(sw)?;
        Ok(())
    }

    pub fn read_byte(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
    ) -> u8 {
        let mut value = 0;
        self.dispatch_access(
            MemoryAccessType::Read,
            MemoryAccessSize::Byte,
            cpu_address,
            bus_address,
            &mut value,
        );
        truncate8(value)
    }

    pub fn read_halfword(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
    ) -> u16 {
        let mut value = 0;
        self.dispatch_access(
            MemoryAccessType::Read,
            MemoryAccessSize::HalfWord,
            cpu_address,
            bus_address,
            &mut value,
        );
        truncate16(value)
    }

    pub fn read_word(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
    ) -> u32 {
        let mut value = 0;
        self.dispatch_access(
            MemoryAccessType::Read,
            MemoryAccessSize::Word,
            cpu_address,
            bus_address,
            &mut value,
        );
        value
    }

    pub fn write_byte(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
        value: u8,
    ) {
        let mut value = zero_extend32_u8(value);
        self.dispatch_access(
            MemoryAccessType::Write,
            MemoryAccessSize::Byte,
            cpu_address,
            bus_address,
            &mut value,
        );
    }

    pub fn write_halfword(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
        value: u16,
    ) {
        let mut value = zero_extend32_u16(value);
        self.dispatch_access(
            MemoryAccessType::Write,
            MemoryAccessSize::HalfWord,
            cpu_address,
            bus_address,
            &mut value,
        );
    }

    pub fn write_word(
        &mut self,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
        value: u32,
    ) {
        let mut value = value;
        self.dispatch_access(
            MemoryAccessType::Write,
            MemoryAccessSize::Word,
            cpu_address,
            bus_address,
            &mut value,
        );
    }

    /// Routes one access. `value` is the 32-bit carrier for every width: reads
    /// leave the result in it, writes take their (already truncated) data
    /// from it. Always reports the access as handled.
    pub fn dispatch_access(
        &mut self,
        access_type: MemoryAccessType,
        size: MemoryAccessSize,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
        value: &mut u32,
    ) -> bool {
        if access_type == MemoryAccessType::Write {
            *value = size.truncate(*value);
        }

        match Region::decode(bus_address) {
            Some(Region::Ram) => self.do_ram_access(access_type, size, bus_address & RAM_MASK, value),
            Some(Region::Bios) => {
                self.do_bios_access(access_type, size, bus_address & BIOS_MASK, value)
            }
            Some(Region::Exp2) => match access_type {
                MemoryAccessType::Read => {
                    self.read_expansion_region2(size, bus_address & EXP2_MASK, value)
                }
                MemoryAccessType::Write => {
                    self.write_expansion_region2(size, bus_address & EXP2_MASK, *value)
                }
            },
            Some(Region::Spu) => match access_type {
                MemoryAccessType::Read => self.read_spu(size, bus_address & SPU_MASK, value),
                MemoryAccessType::Write => self.write_spu(size, bus_address & SPU_MASK, *value),
            },
            Some(Region::Dma) => match access_type {
                MemoryAccessType::Read => self.do_read_dma(size, bus_address & DMA_MASK, value),
                MemoryAccessType::Write => self.do_write_dma(size, bus_address & DMA_MASK, *value),
            },
            None => self.do_invalid_access(access_type, size, cpu_address, bus_address, value),
        }
    }

    fn do_ram_access(
        &mut self,
        access_type: MemoryAccessType,
        size: MemoryAccessSize,
        offset: u32,
        value: &mut u32,
    ) -> bool {
        match access_type {
            MemoryAccessType::Read => *value = self.memory.ram.read(size, offset),
            MemoryAccessType::Write => self.memory.ram.write(size, offset, *value),
        }
        true
    }

    fn do_bios_access(
        &mut self,
        access_type: MemoryAccessType,
        size: MemoryAccessSize,
        offset: u32,
        value: &mut u32,
    ) -> bool {
        match access_type {
            MemoryAccessType::Read => *value = self.memory.bios.read(size, offset),
            MemoryAccessType::Write => {
                trace!(
                    "[BUS] Ignored {} write to BIOS offset {:05X} = {:08X}",
                    size,
                    offset,
                    *value
                );
            }
        }
        true
    }

    fn do_invalid_access(
        &mut self,
        access_type: MemoryAccessType,
        size: MemoryAccessSize,
        cpu_address: PhysicalMemoryAddress,
        bus_address: PhysicalMemoryAddress,
        value: &mut u32,
    ) -> bool {
        let mut message = format!(
            "Invalid bus {} {} at address 0x{:08X} (virtual address 0x{:08X})",
            size, access_type, bus_address, cpu_address
        );
        if access_type == MemoryAccessType::Write {
            message.push_str(&format!(" (value 0x{:08X})", *value));
        }
        error!("{}", message);

        if access_type == MemoryAccessType::Read {
            *value = 0xFFFF_FFFF;
        }

        true
    }

    fn read_expansion_region2(&mut self, size: MemoryAccessSize, offset: u32, value: &mut u32) -> bool {
        // rx/tx buffer empty
        if offset == EXP2_STATUS {
            *value = 0x04 | 0x08;
            return true;
        }

        let address = EXP2_BASE | offset;
        self.do_invalid_access(MemoryAccessType::Read, size, address, address, value)
    }

    fn write_expansion_region2(&mut self, size: MemoryAccessSize, offset: u32, value: u32) -> bool {
        if offset == EXP2_TTY {
            let ch = truncate8(value);
            match ch {
                b'\r' => {}
                b'\n' => {
                    if !self.tty_line_buffer.is_empty() {
                        info!("TTY: {}", String::from_utf8_lossy(&self.tty_line_buffer));
                    }
                    self.tty_line_buffer.clear();
                }
                _ => self.tty_line_buffer.push(ch),
            }
            return true;
        }

        if offset == EXP2_POST {
            warn!("BIOS POST status: {:02X}", value & 0x0F);
            return true;
        }

        let address = EXP2_BASE | offset;
        let mut value = value;
        self.do_invalid_access(MemoryAccessType::Write, size, address, address, &mut value)
    }

    fn read_spu(&mut self, size: MemoryAccessSize, offset: u32, value: &mut u32) -> bool {
        if offset == SPU_STATUS {
            *value = 0;
            return true;
        }

        // The SPU is not emulated; unknown registers read as zero without a
        // diagnostic. Revisit when a real SPU is attached.
        trace!("[SPU] [RD] {} at offset {:03X}", size, offset);
        *value = 0;
        true
    }

    fn write_spu(&mut self, size: MemoryAccessSize, offset: u32, value: u32) -> bool {
        match offset {
            SPU_TRANSFER_FIFO => {}
            SPU_CONTROL => {}
            _ => trace!("[SPU] [WR] {} at offset {:03X} = {:08X}", size, offset, value),
        }
        true
    }

    fn do_read_dma(&mut self, size: MemoryAccessSize, offset: u32, value: &mut u32) -> bool {
        assert_eq!(size, MemoryAccessSize::Word, "DMA registers are word-sized");
        *value = self.dma.read_register(offset);
        true
    }

    fn do_write_dma(&mut self, size: MemoryAccessSize, offset: u32, value: u32) -> bool {
        assert_eq!(size, MemoryAccessSize::Word, "DMA registers are word-sized");
        self.dma.write_register(offset, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RAM_SIZE;

    #[test]
    fn test_region_decode() {
        assert_eq!(Region::decode(0x0000_0000), Some(Region::Ram));
        assert_eq!(Region::decode(0x007F_FFFF), Some(Region::Ram));
        assert_eq!(Region::decode(0x0080_0000), None);
        assert_eq!(Region::decode(0x1F80_1080), Some(Region::Dma));
        assert_eq!(Region::decode(0x1F80_10FF), Some(Region::Dma));
        assert_eq!(Region::decode(0x1F80_1100), None);
        assert_eq!(Region::decode(0x1F80_1C00), Some(Region::Spu));
        assert_eq!(Region::decode(0x1F80_1FFF), Some(Region::Spu));
        assert_eq!(Region::decode(0x1F80_2000), Some(Region::Exp2));
        assert_eq!(Region::decode(0x1F80_3FFF), Some(Region::Exp2));
        assert_eq!(Region::decode(0x1FC0_0000), Some(Region::Bios));
        assert_eq!(Region::decode(0x1FC7_FFFF), Some(Region::Bios));
        assert_eq!(Region::decode(0x1FC8_0000), None);
    }

    #[test]
    fn test_ram_mirrors() {
        let mut bus = Bus::new();
        bus.write_word(0, 0x10, 0xCAFE_BABE);

        for mirror in 0..4u32 {
            let address = mirror * RAM_SIZE as u32 + 0x10;
            assert_eq!(bus.read_word(address, address), 0xCAFE_BABE);
        }
    }

    #[test]
    fn test_narrow_writes_are_writes() {
        let mut bus = Bus::new();
        bus.write_byte(0, 0x20, 0xAB);
        bus.write_halfword(0, 0x22, 0x1234);

        assert_eq!(bus.read_byte(0, 0x20), 0xAB);
        assert_eq!(bus.read_halfword(0, 0x22), 0x1234);
        assert_eq!(bus.read_word(0, 0x20), 0x1234_00AB);
    }

    #[test]
    fn test_write_carrier_is_truncated() {
        let mut bus = Bus::new();
        let mut value = 0xFFFF_FF41;
        bus.dispatch_access(
            MemoryAccessType::Write,
            MemoryAccessSize::Byte,
            0x30,
            0x30,
            &mut value,
        );
        assert_eq!(bus.read_word(0x30, 0x30), 0x41);
    }

    #[test]
    fn test_bios_writes_ignored() {
        let mut bus = Bus::new();
        bus.write_word(BIOS_BASE, BIOS_BASE, 0x1234_5678);
        assert_eq!(bus.read_word(BIOS_BASE, BIOS_BASE), 0);
    }

    #[test]
    fn test_tty_buffer() {
        let mut bus = Bus::new();
        for &ch in b"ok\r" {
            bus.write_byte(EXP2_BASE + 0x23, EXP2_BASE + 0x23, ch);
        }
        assert_eq!(bus.tty_line_buffer(), b"ok");

        bus.write_byte(EXP2_BASE + 0x23, EXP2_BASE + 0x23, b'\n');
        assert!(bus.tty_line_buffer().is_empty());
    }

    #[test]
    fn test_tty_buffer_keeps_raw_bytes() {
        let mut bus = Bus::new();
        for &ch in &[b'A', 0xC3, 0xA9, 0xFF] {
            bus.write_byte(EXP2_BASE + 0x23, EXP2_BASE + 0x23, ch);
        }
        assert_eq!(bus.tty_line_buffer(), &[b'A', 0xC3, 0xA9, 0xFF]);
    }

    #[test]
    fn test_reset_clears_ram_and_dma() {
        let mut bus = Bus::new();
        bus.write_word(0, 0x100, 0xFFFF_FFFF);
        bus.write_word(DMA_BASE + 0x70, DMA_BASE + 0x70, 0);
        bus.reset();

        assert_eq!(bus.read_word(0, 0x100), 0);
        assert_eq!(bus.read_word(DMA_BASE + 0x70, DMA_BASE + 0x70), 0x0765_4321);
    }
}
