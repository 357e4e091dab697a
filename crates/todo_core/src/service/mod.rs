//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate clock, id generation and repository calls into use-case APIs.
//! - Own every business rule; repositories stay rule-free.

pub mod item_service;
