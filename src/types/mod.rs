mod account;
mod feature;
mod plan;
mod usage;

pub use account::*;
pub use feature::*;
pub use plan::*;
pub use usage::*;
