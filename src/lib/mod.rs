//! Shared library modules providing error types, address resolution, and telemetry initialization.

pub mod errors;
pub mod net;
pub mod telemetry;
