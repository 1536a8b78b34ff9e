//! The build pipeline (§4.2, §5): wires a [`BuildConfig`] and the external
//! collaborators together and drives Stages 1 through 4 to completion over a
//! worker pool sized to the configuration, enforcing the per-stage timeout
//! barrier described in the concurrency model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::ast::{ProgressReporter, SourceFileProvider, SyntaxTree};
use crate::binder::Binder;
use crate::config::BuildConfig;
use crate::context::{AnalysisContext, BuildArtifacts};
use crate::error::CoreError;
use crate::typedesc::TypeCalculator;
use crate::{stage1, stage2, stage3, stage4};

/// Summary counters alongside the finished [`CallGraph`], for a caller that
/// wants more than just the graph (e.g. the demonstration CLI).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub classes: usize,
    pub methods: usize,
}

/// Runs the four-stage pipeline once over whatever [`SourceFileProvider`]
/// and collaborators it is handed (§9: the context is owned outright by one
/// `Build`, so concurrent builds never interfere).
pub struct Build {
    config: BuildConfig,
}

impl Build {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Runs Stage 1 through Stage 4 in sequence, returning the finished call
    /// graph. Any stage barrier that exceeds [`BuildConfig::stage_timeout`]
    /// aborts the run and discards partial state (§5 "Cancellation").
    pub fn run(
        self,
        source_files: Arc<dyn SourceFileProvider>,
        binder: Arc<dyn Binder>,
        type_calculator: Arc<dyn TypeCalculator>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<(BuildArtifacts, BuildStats)> {
        let files = source_files.list_source_files();
        if files.is_empty() {
            return Err(CoreError::NoSourceFiles.into());
        }

        let trees: Vec<Arc<dyn SyntaxTree>> = files
            .iter()
            .filter_map(|file| {
                let unit = source_files.load_unit(file);
                if unit.is_none() {
                    tracing::warn!(file = %file, "parser returned no syntax tree for source file");
                }
                unit
            })
            .collect();
        progress.report(&format!("loaded {} of {} source files", trees.len(), files.len()));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build worker pool: {e}"))?;

        let ctx = AnalysisContext::initialize(self.config, binder, type_calculator, progress);

        pool.install(|| run_stage("stage1", &ctx, || stage1::run(&ctx, &trees)))?;
        run_stage_infallible("stage2", &ctx, || stage2::run(&ctx));
        pool.install(|| run_stage("stage3", &ctx, || stage3::run(&ctx, &trees)))?;
        pool.install(|| run_stage("stage4", &ctx, || stage4::run(&ctx, &trees)))?;

        let stats = BuildStats {
            classes: ctx.ids.class_count(),
            methods: ctx.ids.method_count(),
        };
        ctx.progress.report(&format!(
            "build finished: {} classes, {} methods, {} edges",
            stats.classes,
            stats.methods,
            ctx.call_graph.size()
        ));

        Ok((ctx.deinitialize(), stats))
    }
}

/// Times a fallible stage closure and turns an elapsed time beyond the
/// configured budget into a fatal [`CoreError::StageTimeout`] (§5, §7).
fn run_stage(name: &'static str, ctx: &AnalysisContext, f: impl FnOnce() -> Result<()>) -> Result<()> {
    let span = tracing::info_span!("stage", name);
    let _guard = span.enter();
    let started = Instant::now();
    let result = f();
    check_timeout(name, started.elapsed(), ctx.config.stage_timeout)?;
    result
}

/// Same as [`run_stage`], for Stage 2, which runs on the calling thread and
/// never fails (§4.2's closure only reads/writes registries it owns).
fn run_stage_infallible(name: &'static str, ctx: &AnalysisContext, f: impl FnOnce()) {
    let span = tracing::info_span!("stage", name);
    let _guard = span.enter();
    let started = Instant::now();
    f();
    let elapsed = started.elapsed();
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "done");
    if elapsed > ctx.config.stage_timeout {
        tracing::warn!(stage = name, elapsed_ms = elapsed.as_millis() as u64, "stage exceeded its budget");
    }
}

fn check_timeout(name: &'static str, elapsed: Duration, budget: Duration) -> Result<()> {
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "done");
    if elapsed > budget {
        return Err(CoreError::StageTimeout {
            stage: name,
            timeout_ms: budget.as_millis() as u64,
        }
        .into());
    }
    Ok(())
}
