//! Configuration captured at workflow launch.
//!
//! This module provides:
//! - Plugin settings with declared defaults and a model-state round trip
//! - Workchain choices (protocol, electronic and spin type)
//! - JSON loading of the full parameter set

mod parameters;
mod settings;

pub use parameters::{
    AdvancedSettings, ElectronicType, Protocol, SpinType, WorkchainSettings, WorkflowParameters,
};
pub use settings::{FieldOrientation, FrozenType, ProjectionType, Wannier90Settings};
