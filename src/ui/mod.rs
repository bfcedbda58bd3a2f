//! UI module for step output
//!
//! Writes GitHub Actions workflow commands when running inside a job and
//! falls back to plain `console` styled output everywhere else.
//!
//! # Example
//!
//! ```rust,ignore
//! use cistep::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::mask(&ctx, &token);
//!
//! let _group = ui::group(&ctx, "Building projects");
//! ui::info(&ctx, "msbuild started");
//! ui::warning(&ctx, "cache service unavailable");
//! ```

mod context;
mod output;

pub use context::UiContext;
pub use output::{error, format_command, group, info, mask, warning, Group};
