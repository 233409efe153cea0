//! Persistence adapter: level codec and per-slot backing files.

mod codec;
mod store;

pub use codec::*;
pub use store::*;
