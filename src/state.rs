//! Ordered-field save state stream.
//!
//! Fields are written as fixed-width little-endian values with no names or
//! markers, so every `do_state` implementation must visit its fields in the
//! same order when saving and when loading. The same code path drives both
//! directions: a field is passed by `&mut` and is either read from or
//! overwritten by the stream depending on the wrapper's mode.

use crate::error::StateError;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StateMode {
    Read,
    Write,
}

/// A primitive that can be stored verbatim in the state stream.
pub trait StateField: Sized {
    const SIZE: usize;

    fn write_to(&self, out: &mut Vec<u8>);
    fn read_from(bytes: &[u8]) -> Self;
}

macro_rules! impl_state_field {
    ($($ty:ty),*) => {
        $(
            impl StateField for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write_to(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_from(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_state_field!(u8, u16, u32, u64, i8, i16, i32);

impl StateField for bool {
    const SIZE: usize = 1;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

enum Stream<'a> {
    Writer(Vec<u8>),
    Reader { data: &'a [u8], position: usize },
}

pub struct StateWrapper<'a> {
    stream: Stream<'a>,
}

impl<'a> StateWrapper<'a> {
    pub fn writer() -> Self {
        Self {
            stream: Stream::Writer(Vec::new()),
        }
    }

    pub fn reader(data: &'a [u8]) -> Self {
        Self {
            stream: Stream::Reader { data, position: 0 },
        }
    }

    pub fn mode(&self) -> StateMode {
        match self.stream {
            Stream::Writer(_) => StateMode::Write,
            Stream::Reader { .. } => StateMode::Read,
        }
    }

    pub fn is_reading(&self) -> bool {
        self.mode() == StateMode::Read
    }

    pub fn is_writing(&self) -> bool {
        self.mode() == StateMode::Write
    }

    pub fn do_value<T: StateField>(&mut self, value: &mut T) -> Result<(), StateError> {
        match &mut self.stream {
            Stream::Writer(out) => {
                value.write_to(out);
                Ok(())
            }
            Stream::Reader { data, position } => {
                let bytes = take(*data, position, T::SIZE)?;
                *value = T::read_from(bytes);
                Ok(())
            }
        }
    }

    pub fn do_bytes(&mut self, buffer: &mut [u8]) -> Result<(), StateError> {
        match &mut self.stream {
            Stream::Writer(out) => {
                out.extend_from_slice(buffer);
                Ok(())
            }
            Stream::Reader { data, position } => {
                let bytes = take(*data, position, buffer.len())?;
                buffer.copy_from_slice(bytes);
                Ok(())
            }
        }
    }

    /// Bytes not yet consumed by a reader. Always zero for a writer.
    pub fn remaining(&self) -> usize {
        match &self.stream {
            Stream::Writer(_) => 0,
            Stream::Reader { data, position } => data.len() - *position,
        }
    }

    /// Consumes the wrapper and returns the written stream. A reader yields an
    /// empty vector.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.stream {
            Stream::Writer(out) => out,
            Stream::Reader { .. } => Vec::new(),
        }
    }
}

fn take<'a>(data: &'a [u8], position: &mut usize, needed: usize) -> Result<&'a [u8], StateError> {
    let remaining = data.len() - *position;
    if remaining < needed {
        return Err(StateError::UnexpectedEnd { needed, remaining });
    }

    let start = *position;
    *position += needed;
    Ok(&data[start..start + needed])
}
