//! 流程编排层

pub mod audit_flow;

pub use audit_flow::{extract_inputs, run_audit_pipeline, validate_slot};
