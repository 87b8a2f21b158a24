//! Locomotor: third-person character locomotion core
//!
//! Exposes the fixed-step physics driver, contact sensing, capsule resizing,
//! the locomotion state machine and its effect outputs for the CLI and for
//! tests.

pub mod config;
pub mod game;
pub mod logging;
pub mod scenario;
