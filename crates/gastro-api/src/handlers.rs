//! Request handlers.

pub mod health;
pub mod jobs;
pub mod process;
pub mod recipes;

pub use health::*;
pub use jobs::*;
pub use process::*;
pub use recipes::*;
