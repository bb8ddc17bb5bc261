//! # Domain Models
//!
//! Pure types shared by every FieldCrypt crate, with minimal dependencies (`serde`, `serde_json`).
//! Keep it lean: no I/O, no cryptography, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod document;
pub mod mode;
