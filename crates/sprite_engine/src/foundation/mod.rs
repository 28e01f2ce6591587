//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Scratch memory pools
//! - Collections and handle types
//! - Logging utilities

pub mod math;
pub mod memory;
pub mod collections;
pub mod logging;
