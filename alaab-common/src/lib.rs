//! # Alaab Common Library
//!
//! Shared code for the Alaab heritage games catalogue services:
//! - Database schema, migrations and domain models
//! - Review status, review action and match status enums
//! - Event types (AlaabEvent) and the EventBus
//! - Bootstrap configuration loading
//! - Time and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
