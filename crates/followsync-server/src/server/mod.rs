//! Process wiring for the relay.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and validation.
//! - [`upstream`] - Scratch REST follow lists (`ScratchApi`).
//! - [`transport`] - WebSocket connector for the cloud server (`WsConnector`).
//! - [`health`] - HTTP liveness endpoints.
//! - [`telemetry`] - Log, trace and metric setup.

pub mod config;
pub mod health;
pub mod telemetry;
pub mod transport;
pub mod upstream;
