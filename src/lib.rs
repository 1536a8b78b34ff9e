//! Whole-program Class Hierarchy Analysis call-graph construction (§1-§9).
//!
//! The pipeline is four stages run in sequence over a batch of
//! [`ast::SyntaxTree`]s by [`orchestrator::Build`]: skeleton construction
//! (§4.2 Stage 1), a single-threaded class-graph closure (Stage 2), method
//! registration (Stage 3), and call-site resolution/edge emission (Stage 4).
//! Everything the pipeline reads or writes lives on [`context::AnalysisContext`].

pub mod ast;
pub mod binder;
pub mod callgraph;
pub mod config;
pub mod context;
pub mod error;
pub mod excluded;
pub mod ids;
pub mod invocation;
pub mod method_identity;
pub mod model;
pub mod orchestrator;
pub mod overload;
pub mod reference_impl;
pub mod stage1;
pub mod stage2;
pub mod stage3;
pub mod stage4;
pub mod telemetry;
pub mod typedesc;

pub use callgraph::CallGraph;
pub use config::BuildConfig;
pub use context::{AnalysisContext, BuildArtifacts};
pub use error::CoreError;
pub use orchestrator::{Build, BuildStats};
