//! Product catalog
//!
//! Matching user questions against the price list.

pub mod products;

pub use products::{find_related_products, price_text, product_context};
