//! HeatOS Lead API Library
//!
//! Collects heat-pump sales leads through a four-stage funnel
//! (minimal → qualification → discovery → selling) and keeps one progressively
//! enriched record per (email, phone) identity.
//!
//! # Modules
//!
//! - `app`: Router and shared state assembly.
//! - `config`: Configuration management.
//! - `connection`: Backend health gate, startup initializer and heartbeat.
//! - `db`: Database connection and pool management.
//! - `db_storage`: `LeadStore` trait and the PostgreSQL implementation.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `lead_service`: Create and update (merge) flows.
//! - `links`: Follow-up links per stage.
//! - `memory_store`: In-process `LeadStore` used by tests.
//! - `models`: Stage payloads, stored records and responses.
//! - `repository`: Gated, logged access to storage.
//! - `validation`: Stage schema checks and normalization.

pub mod app;
pub mod config;
pub mod connection;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod lead_service;
pub mod links;
pub mod memory_store;
pub mod models;
pub mod repository;
pub mod validation;
