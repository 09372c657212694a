pub mod proof;

pub use proof::*;
