//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the tracker and CLI decoupled from storage details.

pub mod night_service;
