#![forbid(unsafe_code)]

pub mod math;
pub mod value;

pub use math::*;
pub use value::*;
