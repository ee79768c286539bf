pub mod inventory;
pub mod operations;

pub use inventory::LookupError;
pub use operations::{OperationManager, OperationState};
