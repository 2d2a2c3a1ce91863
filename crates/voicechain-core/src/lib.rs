//! Core types for Voicechain: configuration, error taxonomy, session model,
//! and the durable session archive.

pub mod archive;
pub mod config;
pub mod error;
pub mod session;

pub use error::{Result, Stage, VoicechainError};
