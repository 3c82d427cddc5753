#![doc = include_str!("../README.md")]

mod compute;
mod error;
mod gate;
mod key;
mod monitor;
mod pipeline;
mod stats;
mod store;


pub use crate::compute::*;
pub use crate::error::*;
pub use crate::gate::*;
pub use crate::key::*;
pub use crate::monitor::*;
pub use crate::pipeline::*;
pub use crate::stats::*;
pub use crate::store::*;
