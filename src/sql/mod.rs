//! Reverse path: SQL DDL text back into a logical-model shape, with a
//! validation rule engine and an optimization suggestion engine on top.

pub mod inspector;
pub mod lexer;
pub mod optimize;
pub mod validate;

pub use inspector::{InspectedSchema, analyze_sql};
pub use optimize::{OptimizationSuggestion, suggest_optimizations};
pub use validate::{Severity, ValidationIssue, validate_schema};
