//! Domain types and DTOs
//!
//! These types define the data structures for the pricing and cart core.

pub mod cart;
pub mod pricing;
