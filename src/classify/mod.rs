//! Post-call transcript classification

mod classifier;
mod models;

pub use classifier::{CallClassifier, CLASSIFICATION_INSTRUCTIONS};
pub use models::{CalendarEvent, CallClassification, CallbackRequired, IsSpam, ServicePricing};
