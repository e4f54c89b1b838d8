pub mod error;
pub mod csv_io;
pub mod model_io;

pub use error::{IoError, IoResult};
pub use csv_io::*;
pub use model_io::*;
