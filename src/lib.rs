//! Car Insurance Quote Engine Library
//!
//! Premium estimation and insights for the car-insurance quoting product: a trained
//! pricing model combined with rule-based adjustments, factor explanations, a
//! population comparison and pre-aggregated analytics over a reference dataset.
//!
//! # Modules
//!
//! - `catalog`: Closed value sets (brand, fuel, plan, ...) and derived bands.
//! - `money`: Integer-paise rupee amounts.
//! - `encoder`: Request validation and the model feature vector.
//! - `pricing_model`: Model artifact loading and the scorer implementations.
//! - `adjuster`: Rule-based surcharges, add-ons and taxes.
//! - `pricing`: The encoder → model → adjuster pipeline.
//! - `explanation`: "Why this price" factors.
//! - `reference_data`: The historical reference population.
//! - `comparator`: Percentile comparison against similar drivers.
//! - `savings`: Savings tips from population contrasts.
//! - `insights`: Cached analytics sections.
//! - `training`: Offline ridge-regression fit of the model artifact.
//! - `config`: Configuration management.
//! - `bootstrap`: Startup loading and state assembly.
//! - `errors`: Error handling types.
//! - `models`: Wire request and response models.
//! - `services`: Quote, insights and metrics services.
//! - `handlers`: HTTP request handlers.
//! - `app`: Router and middleware.

pub mod adjuster;
pub mod app;
pub mod bootstrap;
pub mod catalog;
pub mod comparator;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod explanation;
pub mod handlers;
pub mod insights;
pub mod models;
pub mod money;
pub mod pricing;
pub mod pricing_model;
pub mod reference_data;
pub mod savings;
pub mod services;
pub mod training;
