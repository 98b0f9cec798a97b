//! Schema Registry Gateway Library
//!
//! Multi-registry dispatch gateway: routes schema-registry operations to
//! one of several configured upstream Kafka Schema Registry instances,
//! enforcing access-mode and scope policy before dispatch and normalizing
//! upstream outcomes into a single result shape.

pub mod api;
pub mod batch;
pub mod client;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod resolve;
pub mod security;
