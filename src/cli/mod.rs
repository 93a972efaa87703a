//! Pieces of the `tvlq` shell: line editing, result rendering and the
//! demo orders/customers tables

mod demo;
mod helper;
mod output;

pub use demo::DemoGenerator;
pub use helper::ReplHelper;
pub use output::{OutputFormat, OutputFormatter};
