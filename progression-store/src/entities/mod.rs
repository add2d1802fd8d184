//! Store Entities
//!
//! Entity models for the authoritative off-chain store.

mod award;
mod character;
mod skill;

pub use award::*;
pub use character::*;
pub use skill::*;
