//! # swimraft-engine::errors
//!
//! Defines internal error types for the engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // Add engine-specific errors here if needed.
}
