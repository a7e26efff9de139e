use std::{io, path::PathBuf};

use thiserror::Error;

use crate::controller::ControllerType;

#[derive(Error, Debug)]
pub enum BiosError {
    #[error("failed to open BIOS image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("BIOS image mismatch, expecting {expected} bytes, got {actual} bytes")]
    SizeMismatch { expected: usize, actual: u64 },
    #[error("failed to read BIOS image: {0}")]
    ShortRead(#[source] io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    #[error("state stream ended early: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u32 },
    #[error("bad state magic {0:#010X}")]
    BadMagic(u32),
    #[error("unsupported state version {0}")]
    UnsupportedVersion(u32),
    #[error("state was saved with controller {saved}, but {attached} is attached")]
    ControllerMismatch {
        saved: ControllerType,
        attached: ControllerType,
    },
    #[error("{0} unread bytes left at end of state")]
    TrailingData(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown mouse button {0:?}")]
    UnknownButton(String),
}
