//! Terminal client for the AI teaching assistant backend.

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod models;
pub mod quiz;
pub mod session;
pub mod ui;
