//! Moonglow — Moonraker print-status LED strip controller.

pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod modes;
pub mod moonraker;
pub mod reconnect;
pub mod strip;

pub use error::MoonglowError;
