pub mod classifier;
pub mod direct_transfer;
pub mod filename;

pub use classifier::{ResourceClassifier, ResourceKind};
pub use direct_transfer::{DirectTransfer, TransferOutcome};
