//! Shared type definitions
//!
//! This module contains the data types shared across the server, the storage
//! layer and the assistant.

pub mod config;
pub mod json;
pub mod message;
pub mod user;
