use thiserror::Error;

/// Fatal conditions that abort a build and discard partial state.
///
/// Everything else in the pipeline is recoverable: a missing binding, a
/// missing type descriptor, or a panic caught at the call-site loop
/// boundary degrades the current site and processing continues. Only the
/// handful of conditions below are reported and torn down via
/// [`crate::context::AnalysisContext::deinitialize`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no source files to process")]
    NoSourceFiles,
    #[error("stage {stage} exceeded its timeout of {timeout_ms}ms")]
    StageTimeout { stage: &'static str, timeout_ms: u64 },
    #[error("identifier registry exhausted its index space")]
    IdentifierOverflow,
}
