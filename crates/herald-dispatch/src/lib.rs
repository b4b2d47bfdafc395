//! # Herald Dispatch
//!
//! Message-to-action dispatch engine for Herald.
//!
//! Inbound chat messages flow through input transformers, the early
//! behavior pipeline, prefix matching, and the command resolution engine,
//! which disambiguates overloads by confidence-weighted scoring before
//! rate limiting, late blockers, and handler execution.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod behavior;
pub mod command;
pub mod context;
pub mod cooldown;
pub mod error;
pub mod handler;
pub mod prefix;
pub mod readers;
pub mod report;
pub mod resolve;
pub mod transform;

pub use behavior::*;
pub use command::*;
pub use context::*;
pub use cooldown::*;
pub use error::*;
pub use handler::*;
pub use prefix::*;
pub use readers::*;
pub use report::*;
pub use resolve::*;
pub use transform::*;
