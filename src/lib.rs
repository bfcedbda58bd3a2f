//! cistep - CI job steps for MSBuild/MSVC projects
//!
//! Builds and runs the targets of a Visual Studio solution, collects code
//! coverage with OpenCppCoverage, analyzes sources with clang-tidy and sends
//! the results to Codecov and Codacy. Tools are installed on demand and kept
//! in a key-addressed cache between runs.

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod codacy;
pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod exec;
pub mod http;
pub mod inputs;
pub mod paths;
pub mod provision;
pub mod ui;

pub use error::{CistepError, CistepResult};
