//! Immo Price Prediction Library
//!
//! This library provides the core functionality for the Belgian residential price
//! prediction service: request validation, feature materialization, the exported
//! regression pipeline, the HTTP API and the form client.
//!
//! # Modules
//!
//! - `app`: Router assembly and OpenAPI document.
//! - `client`: HTTP client for `POST /predict`.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `features`: Named feature rows handed to the pipeline.
//! - `handlers`: HTTP request handlers.
//! - `models`: Listing attributes and closed category sets.
//! - `pipeline`: Pipeline trait and the ONNX pipeline artifact.
//! - `predictor`: Bounded-concurrency inference over a loaded pipeline.
//! - `validation`: Field-by-field payload validation.
//! - `wizard`: Step-by-step form state for the interactive client.

pub mod app;
pub mod client;
pub mod config;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod validation;
pub mod wizard;
