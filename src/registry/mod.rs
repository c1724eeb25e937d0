//! In-memory registries for copy subscriptions and snipe allocations,
//! mirrored to the store on every transition.

pub mod allocations;
pub mod subscriptions;

pub use allocations::AllocationBook;
pub use subscriptions::SubscriptionBook;
