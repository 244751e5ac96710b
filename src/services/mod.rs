//! Resource services built on the pagination engine.

mod issues;
mod labels;

pub use issues::*;
pub use labels::*;
