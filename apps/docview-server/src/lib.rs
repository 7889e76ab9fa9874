//! DocView Server Library
//!
//! Coordinates viewing sessions with a remote document conversion service
//! and proxies the viewer's document-content traffic to it with the
//! server-held credential attached.
//!
//! # Modules
//!
//! - `session`: Two-stage session creation and background source upload
//! - `proxy`: Streaming, credential-injecting reverse proxy
//! - `viewer`: Client bootstrap and presentation-control bridge
//! - `documents`: Trusted document store

pub mod app;
pub mod backend;
pub mod config;
pub mod documents;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod state;
pub mod viewer;
