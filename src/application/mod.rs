//! Application layer with services used by image consumers.

/// Consumer-side services.
pub mod services;

pub use services::ImageSlot;
