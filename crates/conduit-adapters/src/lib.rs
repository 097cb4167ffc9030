//! Client Adapter Registry and Injection Planner.
//!
//! Each AI client tool (Claude Code, Cursor, VS Code, Gemini CLI) gets a
//! small [`Adapter`] that knows where its MCP config lives and which JSON
//! key server entries sit under; the actual plan/apply/validate/rollback
//! mechanics are shared in `ops` since they're identical across clients.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod adapter;
mod atomic;
mod change_set;
mod claude_code;
mod cursor;
mod gemini_cli;
mod json_doc;
mod ops;
mod registry;
mod types;
mod vscode;

pub use adapter::Adapter;
pub use claude_code::ClaudeCodeAdapter;
pub use cursor::CursorAdapter;
pub use gemini_cli::GeminiCliAdapter;
pub use registry::AdapterRegistry;
pub use types::{
    ApplyResult, ConfigRoot, DetectResult, InjectionOp, InjectionPlan, Issue, IssueSeverity, PlanRequest, RollbackResult, ValidationResult, ValidationStatus,
};
pub use vscode::VsCodeAdapter;
