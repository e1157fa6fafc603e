//! Location-sharing and messaging backend for a live, location-based group game.
//!
//! Players report positions and status, leads watch them on a map, exchange
//! messages and hand out target locations. Everything is persisted through the
//! [`store::Datastore`] gateway, which is injected into each service.

pub mod config;
pub mod http;
pub mod identity;
pub mod services;
pub mod store;
pub mod telemetry;
