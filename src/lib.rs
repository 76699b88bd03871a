//! kwild - wildcard selection of Kubernetes resources
//!
//! Compiles a filter specification (name patterns, namespace and node scope,
//! label and annotation rules, age bounds and pod health rules) once, then
//! evaluates it over a discovered resource list, returning the matching
//! subset in input order.

pub mod action;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filtering;
pub mod patterns;

pub use error::{KwildError, Result};
