//! Bluetooth Module
//!
//! Provides the BLE link to the controlled peripheral.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │   (lifecycle manager - owns Session + ConnectionState)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼──────────────┐
//!         │             │              │
//!         ▼             ▼              ▼
//! ┌────────────┐  ┌────────────┐  ┌─────────────┐
//! │ Connection │  │  Resolver  │  │ Transmitter │
//! │            │  │            │  │             │
//! │ - Session  │  │ - UART ids │  │ - line      │
//! │ - listener │  │ - fallback │  │   encoding  │
//! │   handles  │  │   scan     │  │ - simulated │
//! └────────────┘  └────────────┘  └─────────────┘
//!         │             │              │
//!         └─────────────┼──────────────┘
//!                       ▼
//!              ┌─────────────────┐
//!              │    Platform     │
//!              │ (handle traits, │
//!              │  WinRT backend) │
//!              └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Identifiers, write flags and command encoding
//! - [`platform`] - Handle traits, errors and host detection
//! - [`resolver`] - Locates the writable characteristic
//! - [`connection`] - Session bundle, disconnection subscriptions, teardown
//! - [`transmitter`] - Sends one command line
//! - [`service`] - Connection lifecycle manager

pub mod connection;
pub mod platform;
pub mod protocol;
pub mod resolver;
#[cfg(windows)]
pub mod scanner;
pub mod service;
pub mod transmitter;
#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub(crate) mod simulated;

// Re-export main service for convenience
pub use service::BluetoothService;
