//! End-to-end scenarios through the `bazaar` facade
//!
//! ```bash
//! cargo test --test scenarios
//! ```

mod common;

mod lifecycle;
mod properties;
