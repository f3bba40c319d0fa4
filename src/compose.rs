//! Compositor: picks a product mode from the inputs that are present and turns it into one or
//! two encoder jobs.

pub mod compositor;
pub mod filter;
pub mod mode;
pub mod validate;
