//! HoardMap - outdoor-advertising asset management over Elasticsearch
//!
//! This library provides shared types and modules for the server and seed
//! binaries: the hoarding document model, the route-relative geo query
//! engine, the document store, and the image/vision/mail collaborators.

pub mod elasticsearch;
pub mod geo;
pub mod hoardings;
pub mod imagery;
pub mod mail;
pub mod models;
pub mod vision;

pub use hoardings::HoardingService;
pub use models::{ConsultationStatus, Hoarding, HoardingDraft, HoardingPatch, HoardingSummary};
