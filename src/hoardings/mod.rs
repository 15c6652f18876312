//! Hoarding record management.

pub mod service;

pub use service::{HoardingService, ImageUpload, ServiceError};
