pub mod classification;
pub mod analysis;

pub use classification::*;
pub use analysis::*;
