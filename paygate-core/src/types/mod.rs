//! Common types used across the paygate crates.

mod amount;
mod common;

pub use amount::*;
pub use common::*;
