//! Core types for causegraph.

mod cluster;
mod descriptor;
mod key;
mod message;
mod record;

pub use cluster::*;
pub use descriptor::*;
pub use key::*;
pub use message::*;
pub use record::*;
