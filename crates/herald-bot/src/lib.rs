//! # Herald Bot
//!
//! Chat bot binary wiring the Herald dispatch engine to its gateway,
//! configuration, and startup registration phase.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod error;

pub use bot::*;
pub use error::*;
