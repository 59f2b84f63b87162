//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services.

pub mod rest;

pub use rest::*;
