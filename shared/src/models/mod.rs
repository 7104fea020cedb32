//! Domain models and calculators for the farm dashboard

mod expense;
mod harvest;
mod inventory;
mod irrigation;
mod origin;
mod partner;

pub use expense::*;
pub use harvest::*;
pub use inventory::*;
pub use irrigation::*;
pub use origin::*;
pub use partner::*;
