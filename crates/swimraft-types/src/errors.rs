//! # swimraft-types::errors
//!
//! Common error types shared across the workspace. Using `thiserror` gives
//! clean, descriptive error messages. Protocol-specific rejections
//! (`SwimError`, `RaftError`, `LimboError`) live in `swimraft-proto`; these
//! are the errors the host/engine layer can produce.

use crate::time::SimTime;
use thiserror::Error;

/// A general-purpose error for the engine.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("time overflow: {base} + {offset}")]
    TimeOverflow { base: SimTime, offset: SimTime },
    #[error("time underflow: {base} - {offset}")]
    TimeUnderflow { base: SimTime, offset: SimTime },
    #[error("monotonic id counter overflowed")]
    IdOverflow,
    #[error("node with id {0} not found")]
    NodeNotFound(u32),
    #[error("link with id {0} not found")]
    LinkNotFound(u64),
    #[error("protocol with tag {0:?} not registered")]
    ProtocolNotRegistered(super::envelope::ProtoTag),
}

/// An error related to parsing or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("validation error in '{name}': {message}")]
    Validation { name: String, message: String },
}

/// An error during message encoding or decoding. Decoders must never panic
/// on untrusted input; every malformed-wire case is one of these variants.
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    #[error("truncated message: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("malformed msgpack: {0}")]
    Malformed(String),
    #[error("missing mandatory field: {0}")]
    MissingField(&'static str),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),
    #[error("message exceeds mtu of {mtu} bytes after fragmentation")]
    ExceedsMtu { mtu: usize },
    #[error("crypto error: {0}")]
    Crypto(String),
}

/// An error originating from the storage/WAL subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("no space left on device")]
    NoSpace,
    #[error("record at index {0} not found")]
    NotFound(u64),
    #[error("operation failed due to injected fault")]
    FaultInjected,
}

/// An error originating from the network transport.
#[derive(Error, Debug, Clone)]
pub enum NetError {
    #[error("message exceeds MTU of {mtu} bytes")]
    ExceedsMtu { mtu: usize },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("no route to node {0}")]
    NoRoute(u32),
}
