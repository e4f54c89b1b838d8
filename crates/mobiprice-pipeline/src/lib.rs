pub mod config;
pub mod model;
pub mod bundle;
pub mod trainer;
pub mod job;

pub use config::*;
pub use model::*;
pub use bundle::*;
pub use trainer::*;
pub use job::*;
