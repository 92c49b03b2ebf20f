// src/models/mod.rs

//! Domain models for the fanout application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
pub mod equality;
mod event;
pub mod topic;

// Re-export all public types
pub use catalog::{Book, Catalog, Course, Instructor, Meeting, Note, Section, SectionRef, Subject};
pub use config::{AuditConfig, Config, DispatchConfig, GatewayConfig, LoggingConfig, NotifierConfig};
pub use equality::{Mismatch, StructuralEq, equal, verbose_equal};
pub use event::{ChangeEvent, GatewayResponse, MessageId, PushData, PushMessage, TOPIC_PREFIX};
