//! # Resource Management
//!
//! Tracks which producer resources the displayed frame references and hands
//! the rest back.
//!
//! - [`ResourceProvider`]: resource manager contract (child registration,
//!   id mapping, used-set declaration)
//! - [`LocalResourceProvider`]: in-process provider
//! - [`ResourceTranslationTable`]: per-frame remapping on top of a provider

pub mod provider;
pub mod translation;

pub use provider::{LocalResourceProvider, ResourceProvider, ReturnCallback};
pub use translation::{ResourceTranslationTable, TranslationError};
