pub mod defs;

pub use defs::{LiveSourceSpec, RawEntry};
