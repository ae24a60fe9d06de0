pub mod branch;
pub mod collab;
pub mod config;
pub mod deps;
pub mod error;
pub mod feature;
pub mod id;
pub mod index;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod schedule;
pub mod status;
pub mod store;
pub mod task;
pub mod validation;

pub use error::{Result, TaskflowError};
