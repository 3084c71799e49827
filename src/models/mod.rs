pub mod certificate;
pub mod common;
pub mod inventory;
pub mod invoice;

pub use certificate::*;
pub use common::*;
pub use inventory::*;
pub use invoice::*;
