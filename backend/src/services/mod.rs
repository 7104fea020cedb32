//! Business logic services for the farm dashboard

pub mod expenses;
pub mod harvest;
pub mod inventory;
pub mod irrigation;
pub mod partners;

pub use expenses::ExpenseService;
pub use harvest::HarvestService;
pub use inventory::InventoryService;
pub use irrigation::IrrigationService;
pub use partners::PartnerService;
