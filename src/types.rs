use std::fmt;

pub type PhysicalMemoryAddress = u32;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MemoryAccessType {
    Read,
    Write,
}

impl fmt::Display for MemoryAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccessType::Read => write!(f, "read"),
            MemoryAccessType::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MemoryAccessSize {
    Byte,
    HalfWord,
    Word,
}

impl MemoryAccessSize {
    /// Number of bytes moved by an access of this width.
    pub const fn bytes(self) -> usize {
        match self {
            MemoryAccessSize::Byte => 1,
            MemoryAccessSize::HalfWord => 2,
            MemoryAccessSize::Word => 4,
        }
    }

    /// Truncates the 32-bit carrier down to this width, zero-extended back
    /// into a u32. Every bus access moves a full u32 regardless of width.
    pub const fn truncate(self, value: u32) -> u32 {
        match self {
            MemoryAccessSize::Byte => zero_extend32_u8(truncate8(value)),
            MemoryAccessSize::HalfWord => zero_extend32_u16(truncate16(value)),
            MemoryAccessSize::Word => value,
        }
    }
}

impl fmt::Display for MemoryAccessSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccessSize::Byte => write!(f, "byte"),
            MemoryAccessSize::HalfWord => write!(f, "halfword"),
            MemoryAccessSize::Word => write!(f, "word"),
        }
    }
}

pub const fn truncate8(value: u32) -> u8 {
    value as u8
}

pub const fn truncate16(value: u32) -> u16 {
    value as u16
}

pub const fn zero_extend32_u8(value: u8) -> u32 {
    value as u32
}

pub const fn zero_extend32_u16(value: u16) -> u32 {
    value as u32
}

pub const fn sign_extend32_u8(value: u8) -> u32 {
    value as i8 as i32 as u32
}

pub const fn sign_extend32_u16(value: u16) -> u32 {
    value as i16 as i32 as u32
}
