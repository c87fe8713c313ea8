//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record stores and the grid engine into use-case APIs.
//! - Keep CLI/UI layers decoupled from storage details.

pub mod planner_service;
pub mod roster_service;
