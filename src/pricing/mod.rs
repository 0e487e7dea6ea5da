//! Pricing engine: static tables, the pure calculator, and the computation
//! channel the HTTP layer talks to.

pub mod calculator;
pub mod engine;
pub mod tables;

pub use engine::PricingHandle;
pub use tables::PricingTables;
