mod error;
mod evaluator;
pub mod init;
mod simulation;

pub use error::Error;
pub use evaluator::*;
pub use simulation::*;
