pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod monitor;
pub mod parse;
pub mod storage;

pub use error::{OccupancyError, Result};
