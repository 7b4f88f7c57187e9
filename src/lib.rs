//! Sulama Asistanı Library
//!
//! Core library for the irrigation advice chat server.

pub mod agent;
pub mod catalog;
pub mod export;
pub mod inference;
pub mod server;
pub mod storage;
pub mod types;
