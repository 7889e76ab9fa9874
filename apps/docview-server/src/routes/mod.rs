//! Route modules for DocView Server

pub mod health;
pub mod proxy;
pub mod viewing;
