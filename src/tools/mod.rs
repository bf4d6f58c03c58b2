//! Unmetered utilities.

pub mod convert;
