//! Shared types and calculators for the farm management dashboard
//!
//! Everything here is pure: the backend feeds it rows fetched from storage
//! and the WASM crate feeds it JSON coming from the browser.

pub mod models;
pub mod numeric;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
