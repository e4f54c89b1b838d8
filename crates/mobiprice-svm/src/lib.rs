pub mod linear_svc;

pub use linear_svc::*;
