//! Excluded-file and auto-generated-file detection (§6).

use crate::ast::FilePath;
use crate::config::BuildConfig;

/// A file is excluded if it sits under a directory path segment matching
/// one of `excluded_path_markers` (case-sensitive, exact segment match) or
/// imports a package beginning with a recognized test-framework prefix.
pub(crate) fn is_excluded_file(config: &BuildConfig, file: &FilePath, imports: &[String]) -> bool {
    if path_has_marker_segment(file, &config.excluded_path_markers) {
        return true;
    }
    imports.iter().any(|import| {
        config
            .test_framework_import_prefixes
            .iter()
            .any(|prefix| import.starts_with(prefix.as_str()))
    })
}

fn path_has_marker_segment(file: &FilePath, markers: &[String]) -> bool {
    file.split(['/', '\\'])
        .any(|segment| markers.iter().any(|marker| marker == segment))
}

/// A type is auto-generated if it directly implements or extends a
/// configured marker interface/base (checked by fully-qualified name of the
/// immediate super or a direct interface).
pub(crate) fn is_auto_generated(
    config: &BuildConfig,
    super_qualified_name: Option<&str>,
    interface_qualified_names: &[String],
) -> bool {
    let matches = |name: &str| config.generated_marker_types.iter().any(|m| m == name);
    super_qualified_name.is_some_and(matches) || interface_qualified_names.iter().any(|n| matches(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_segment_is_excluded() {
        let config = BuildConfig::default();
        let file: FilePath = "src/test/java/com/example/FooTest.java".into();
        assert!(is_excluded_file(&config, &file, &[]));
    }

    #[test]
    fn example_directory_segment_is_excluded() {
        let config = BuildConfig::default();
        let file: FilePath = "examples/com/example/Demo.java".into();
        assert!(is_excluded_file(&config, &file, &[]));
    }

    #[test]
    fn non_matching_substring_is_not_excluded() {
        let config = BuildConfig::default();
        // "latest" contains "test" as a substring but not as a path segment.
        let file: FilePath = "src/main/java/com/example/latest/Foo.java".into();
        assert!(!is_excluded_file(&config, &file, &[]));
    }

    #[test]
    fn test_framework_import_excludes_file() {
        let config = BuildConfig::default();
        let file: FilePath = "src/main/java/com/example/Foo.java".into();
        let imports = vec!["org.junit.Test".to_string()];
        assert!(is_excluded_file(&config, &file, &imports));
    }

    #[test]
    fn generated_marker_interface_is_detected() {
        let config = BuildConfig::default();
        assert!(is_auto_generated(
            &config,
            Some("com.google.protobuf.GeneratedMessageV3"),
            &[]
        ));
        assert!(!is_auto_generated(&config, Some("java.lang.Object"), &[]));
    }
}
