//! Pulseboard event server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod bus;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod events;
pub mod http;
pub mod routes;
pub mod sse;
pub mod state;
