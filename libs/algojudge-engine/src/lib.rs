//! Grading engine for algorithm exercises.
//!
//! A submission is transpiled to JavaScript, checked against exercise
//! constraints, run once per test case in an isolated runtime process, and
//! judged against expected output that may itself be computed from a
//! reference solution. [`Grader`] ties the phases together.

pub mod config;
pub mod constraints;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod input;
pub mod source;
pub mod transpiler;
pub mod value;

#[cfg(test)]
mod engine_tests;

pub use config::{LanguageConfig, LanguageConfigManager, RuntimeConfig};
pub use constraints::{validate, ValidationResult};
pub use context::RunContext;
pub use engine::{NodeSandbox, RunOutput, Sandbox};
pub use error::{CompileError, ExecutionError};
pub use executor::Grader;
pub use input::{parse_input, ParsedInput};
pub use transpiler::{ConfiguredTranspiler, Transpiler};
