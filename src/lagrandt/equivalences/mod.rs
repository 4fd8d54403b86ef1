pub mod error;
pub mod fetch;
pub mod io;
pub mod mapping;
pub mod model;
pub mod pipeline;

pub use error::{Result, ToolError};
