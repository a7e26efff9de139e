use tracing::{trace, warn};

use crate::{error::StateError, state::StateWrapper};

pub const NUM_CHANNELS: usize = 7;

const DPCR_OFFSET: u32 = 0x70;
const DICR_OFFSET: u32 = 0x74;
const DPCR_RESET_VALUE: u32 = 0x0765_4321;

const MADR_MASK: u32 = 0x00FF_FFFF;
const DICR_WRITE_MASK: u32 = 0x00FF_803F;
const DICR_FLAGS_MASK: u32 = 0x7F00_0000;
const DICR_MASTER_FLAG: u32 = 0x8000_0000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    pub base_address: u32,
    pub block_control: u32,
    pub channel_control: u32,
}

/// DMA controller register file. The bus forwards every access inside the
/// DMA window here by offset; transfers are not performed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dma {
    pub channels: [Channel; NUM_CHANNELS],
    pub control: u32,
    pub interrupt: u32,
}

impl Default for Dma {
    fn default() -> Self {
        Self {
            channels: [Channel::default(); NUM_CHANNELS],
            control: DPCR_RESET_VALUE,
            interrupt: 0,
        }
    }
}

impl Dma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn read_register(&self, offset: u32) -> u32 {
        let value = match offset {
            DPCR_OFFSET => self.control,
            DICR_OFFSET => self.interrupt,
            _ => {
                let channel = (offset >> 4) as usize;
                match (self.channels.get(channel), offset & 0x0F) {
                    (Some(ch), 0x0) => ch.base_address,
                    (Some(ch), 0x4) => ch.block_control,
                    (Some(ch), 0x8) => ch.channel_control,
                    _ => {
                        warn!("[DMA] Unhandled register read at offset {:02X}", offset);
                        0xFFFF_FFFF
                    }
                }
            }
        };

        trace!("[DMA] [RD] [{:02X}] = {:08X}", offset, value);
        value
    }

    pub fn write_register(&mut self, offset: u32, value: u32) {
        trace!("[DMA] [WR] [{:02X}] = {:08X}", offset, value);
        match offset {
            DPCR_OFFSET => self.control = value,
            DICR_OFFSET => {
                // flag bits are acknowledged by writing 1
                let flags = (self.interrupt & DICR_FLAGS_MASK) & !(value & DICR_FLAGS_MASK);
                self.interrupt = (value & DICR_WRITE_MASK) | flags;
                self.update_master_flag();
            }
            _ => {
                let channel = (offset >> 4) as usize;
                let register = offset & 0x0F;
                match self.channels.get_mut(channel) {
                    Some(ch) if register == 0x0 => ch.base_address = value & MADR_MASK,
                    Some(ch) if register == 0x4 => ch.block_control = value,
                    Some(ch) if register == 0x8 => ch.channel_control = value,
                    _ => warn!(
                        "[DMA] Unhandled register write at offset {:02X} = {:08X}",
                        offset, value
                    ),
                }
            }
        }
    }

    fn update_master_flag(&mut self) {
        let force = self.interrupt & (1 << 15) != 0;
        let master_enable = self.interrupt & (1 << 23) != 0;
        let enabled = (self.interrupt >> 16) & 0x7F;
        let flagged = (self.interrupt >> 24) & 0x7F;

        if force || (master_enable && (enabled & flagged) != 0) {
            self.interrupt |= DICR_MASTER_FLAG;
        } else {
            self.interrupt &= !DICR_MASTER_FLAG;
        }
    }

    pub fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        for channel in self.channels.iter_mut() {
            sw.do_value(&mut channel.base_address)?;
            sw.do_value(&mut channel.block_control)?;
            sw.do_value(&mut channel.channel_control)?;
        }
        sw.do_value(&mut self.control)?;
        sw.do_value(&mut self.interrupt)?;
        Ok(())
    }
}
