pub mod advisory;
pub mod bluetooth;
pub mod haptics;
pub mod logging;
