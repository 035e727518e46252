pub mod apply;
pub mod assert;
pub mod compare;
pub mod document;
pub mod error;
pub mod io;
pub mod label;
pub mod path;
pub mod recipe;
pub mod retry;
pub mod store;
pub mod types;

pub use error::{Result, StewardError};
