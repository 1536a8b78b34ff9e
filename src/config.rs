use std::time::Duration;

/// Tunables for a single [`crate::orchestrator::Build`] run.
///
/// Constructible by a library consumer directly, or via the demonstration
/// CLI's flags (see `src/main.rs`).
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Wall-clock budget for a single stage barrier (Stage 1, 2, 3, or 4)
    /// across every file. Exceeding it is a fatal [`crate::error::CoreError::StageTimeout`].
    pub stage_timeout: Duration,
    /// Worker threads used for Stages 1, 3, and 4. `None` means
    /// `max(1, available_parallelism - 1)`, per the concurrency model.
    pub worker_threads: Option<usize>,
    /// Path segments (matched exactly against a path component) that mark
    /// a file as excluded, e.g. `test`, `example`.
    pub excluded_path_markers: Vec<String>,
    /// Import prefixes that, if present anywhere in a file, mark it excluded
    /// as depending on a test framework.
    pub test_framework_import_prefixes: Vec<String>,
    /// Fully-qualified marker types: a class directly implementing or
    /// extending one of these is auto-generated and excluded.
    pub generated_marker_types: Vec<String>,
    /// Fully-qualified name of the universal top type (the implicit root
    /// of the class hierarchy when a class declares no explicit super).
    /// Recorded as an immediate super when named explicitly, but never
    /// accumulates subclasses in `reachable_subs` (§3 invariant).
    pub universal_top_type: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(300),
            worker_threads: None,
            excluded_path_markers: vec!["test".to_string(), "example".to_string()],
            test_framework_import_prefixes: vec![
                "org.junit".to_string(),
                "org.testng".to_string(),
                "org.mockito".to_string(),
            ],
            generated_marker_types: vec![
                "com.google.protobuf.GeneratedMessage".to_string(),
                "com.google.protobuf.GeneratedMessageV3".to_string(),
            ],
            universal_top_type: "java.lang.Object".to_string(),
        }
    }
}

impl BuildConfig {
    pub(crate) fn worker_count(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            let cores = num_cpus::get();
            cores.saturating_sub(1).max(1)
        })
    }
}
