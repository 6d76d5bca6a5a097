//! Session management ports

pub mod ports;
