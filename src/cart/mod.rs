//! Cart core: item utilities, summary computation, pure operations, the
//! tiered store and the orchestrating service.

pub mod item;
pub mod ops;
pub mod service;
pub mod store;
pub mod summary;

pub use ops::CartAction;
pub use service::CartService;
