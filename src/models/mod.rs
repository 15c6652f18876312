//! Core data models for the hoarding management system.

pub mod hoarding;

pub use hoarding::{
    ConsultationStatus, GeoPoint, Hoarding, HoardingDraft, HoardingPatch, HoardingSummary, Location,
};
