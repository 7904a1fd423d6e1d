//! Spreadsheet intake and report rendering.

pub mod read;
pub mod write;
