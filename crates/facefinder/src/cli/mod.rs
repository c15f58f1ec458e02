//! Command implementations.

pub mod compare;
pub mod config;
pub mod embed;
pub mod group;
pub mod info;
