//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the bridge:
//! - Matrix types and the small amount of 2D math quad transforms need
//! - Logging utilities

pub mod math;
pub mod logging;
