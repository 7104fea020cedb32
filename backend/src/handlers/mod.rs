//! HTTP handlers for the farm dashboard API

pub mod expenses;
pub mod harvest;
pub mod health;
pub mod inventory;
pub mod irrigation;
pub mod partners;

pub use expenses::*;
pub use harvest::*;
pub use health::*;
pub use inventory::*;
pub use irrigation::*;
pub use partners::*;
