//! Headless shell around the wallet session workspace crates.

pub mod bridge;

pub use bridge::SessionBridge;
