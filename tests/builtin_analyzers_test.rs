//! Tests for the filesystem and git backed analyzers against real
//! directory fixtures.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use specify_analysis::analyzers::builtin::{
    FsArchitectureDetector, FsClassifier, GitContextAnalyzer, ManifestDependencyMapper,
};
use specify_analysis::analyzers::{
    ArchitectureDetector, ArchitectureParams, ClassificationResult, Classifier, ClassifyParams,
    ContextAnalyzer, ContextParams, DependencyMapper, DependencyParams,
};
use specify_analysis::cycle::AnalysisDepth;
use specify_analysis::AnalyzerFailure;

// ============================================================================
// Fixtures
// ============================================================================

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (relative, contents) in files {
        write(dir.path(), relative, contents);
    }
    dir
}

fn classify_params(depth: AnalysisDepth, include_dependencies: bool) -> ClassifyParams {
    ClassifyParams {
        depth,
        include_dependencies,
    }
}

fn architecture_params(framework_specific: bool) -> ArchitectureParams {
    ArchitectureParams {
        prior_classification: None,
        framework_specific,
    }
}

fn dependency_params(include_transitive: bool) -> DependencyParams {
    DependencyParams {
        include_transitive,
        check_vulnerabilities: false,
        check_licenses: false,
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[tokio::test]
async fn test_small_rust_project_is_greenfield() {
    let dir = project(&[
        ("Cargo.toml", "[package]\nname = \"demo\"\n"),
        ("src/main.rs", "fn main() {}\n"),
    ]);

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Quick, true))
        .await
        .unwrap();

    assert_eq!(result.project_type, "greenfield");
    assert_eq!(result.tech_stack, vec!["rust", "cargo"]);
    assert_eq!(result.confidence, Some(0.6));
    assert_eq!(result.complexity_score, 1);
}

#[tokio::test]
async fn test_manifest_tools_need_dependency_flag() {
    let dir = project(&[("package.json", "{}"), ("index.js", "")]);

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Standard, false))
        .await
        .unwrap();

    assert_eq!(result.tech_stack, vec!["javascript"]);
    assert_eq!(result.confidence, Some(0.75));
}

#[tokio::test]
async fn test_empty_project_has_low_confidence() {
    let dir = tempdir().unwrap();

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Deep, true))
        .await
        .unwrap();

    assert_eq!(result.project_type, "greenfield");
    assert_eq!(result.confidence, Some(0.3));
    assert!(result.tech_stack.is_empty());
}

#[tokio::test]
async fn test_untested_project_is_prototype() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        write(dir.path(), &format!("pkg/mod_{}.py", i), "");
    }

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Quick, false))
        .await
        .unwrap();
    assert_eq!(result.project_type, "prototype");

    write(dir.path(), "pkg/test_mod.py", "");
    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Quick, false))
        .await
        .unwrap();
    assert_eq!(result.project_type, "ongoing");
}

#[tokio::test]
async fn test_legacy_directory_marks_brownfield() {
    let dir = tempdir().unwrap();
    for i in 0..11 {
        write(dir.path(), &format!("legacy/old_{}.java", i), "");
    }

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Quick, false))
        .await
        .unwrap();

    assert_eq!(result.project_type, "brownfield");
    assert!(result.indicators.contains(&"legacy directories".to_string()));
}

#[tokio::test]
async fn test_vendored_directories_are_skipped() {
    let dir = project(&[("index.js", "")]);
    for i in 0..30 {
        write(dir.path(), &format!("node_modules/dep_{}/index.js", i), "");
    }

    let result = FsClassifier
        .classify(dir.path(), &classify_params(AnalysisDepth::Deep, false))
        .await
        .unwrap();

    assert_eq!(result.project_type, "greenfield");
    assert!(result.indicators.contains(&"files: 1".to_string()));
}

#[test]
fn test_deeper_walk_finds_nested_files() {
    let dir = project(&[("a/b/c/lib.rs", "")]);

    let quick = tokio_test::block_on(
        FsClassifier.classify(dir.path(), &classify_params(AnalysisDepth::Quick, false)),
    )
    .unwrap();
    let deep = tokio_test::block_on(
        FsClassifier.classify(dir.path(), &classify_params(AnalysisDepth::Deep, false)),
    )
    .unwrap();

    assert_eq!(quick.confidence, Some(0.3));
    assert_eq!(deep.confidence, Some(0.85));
    assert_eq!(deep.tech_stack, vec!["rust"]);
}

#[tokio::test]
async fn test_missing_project_fails_classification() {
    let dir = tempdir().unwrap();

    let result = FsClassifier
        .classify(
            &dir.path().join("nope"),
            &classify_params(AnalysisDepth::Quick, false),
        )
        .await;

    assert!(matches!(result, Err(AnalyzerFailure::Failed { .. })));
}

// ============================================================================
// Architecture Detector
// ============================================================================

#[tokio::test]
async fn test_mvc_layout_detected() {
    let dir = project(&[
        ("models/user.rb", ""),
        ("views/index.erb", ""),
        ("controllers/users.rb", ""),
        ("api/v1.rb", ""),
        ("routes/web.rb", ""),
        ("tests/user_test.rb", ""),
    ]);

    let result = FsArchitectureDetector
        .detect(dir.path(), &architecture_params(false))
        .await
        .unwrap();

    assert_eq!(result.primary_pattern, "mvc");
    assert_eq!(result.confidence, Some(0.9));
    assert_eq!(result.secondary_patterns, vec!["api-first"]);
    assert_eq!(result.framework, None);
    assert!(result.concerns.is_empty());
}

#[tokio::test]
async fn test_flat_project_is_monolithic() {
    let dir = project(&[("main.go", "package main\n")]);

    let result = FsArchitectureDetector
        .detect(dir.path(), &architecture_params(true))
        .await
        .unwrap();

    assert_eq!(result.primary_pattern, "monolithic");
    assert_eq!(result.confidence, Some(0.4));
    assert_eq!(
        result.concerns,
        vec!["No dedicated test directory", "Flat project layout"]
    );
}

#[tokio::test]
async fn test_framework_from_manifest() {
    let dir = project(&[
        (
            "Cargo.toml",
            "[package]\nname = \"svc\"\n\n[dependencies]\naxum = \"0.7\"\n",
        ),
        ("src/handlers/mod.rs", ""),
    ]);

    let result = FsArchitectureDetector
        .detect(dir.path(), &architecture_params(true))
        .await
        .unwrap();

    assert_eq!(result.framework.as_deref(), Some("axum"));
}

#[tokio::test]
async fn test_framework_from_prior_classification() {
    let dir = project(&[("src/App.tsx", "")]);
    let params = ArchitectureParams {
        prior_classification: Some(ClassificationResult {
            project_type: "greenfield".to_string(),
            confidence: Some(0.6),
            complexity_score: 1,
            tech_stack: vec!["typescript".to_string(), "react".to_string()],
            indicators: vec![],
        }),
        framework_specific: true,
    };

    let result = FsArchitectureDetector.detect(dir.path(), &params).await.unwrap();

    assert_eq!(result.framework.as_deref(), Some("react"));
}

// ============================================================================
// Dependency Mapper
// ============================================================================

const CARGO_TOML: &str = r#"
[package]
name = "demo"
version = "0.1.0"

[dependencies]
serde = "1"
tokio = { version = "1", features = ["full"] }

[dev-dependencies]
tempfile = "3"
"#;

const CARGO_LOCK: &str = r#"
[[package]]
name = "demo"

[[package]]
name = "serde"

[[package]]
name = "tokio"

[[package]]
name = "tempfile"

[[package]]
name = "mio"

[[package]]
name = "libc"
"#;

#[tokio::test]
async fn test_cargo_project_dependencies() {
    let dir = project(&[("Cargo.toml", CARGO_TOML), ("Cargo.lock", CARGO_LOCK)]);

    let result = ManifestDependencyMapper
        .map_dependencies(dir.path(), &dependency_params(true))
        .await
        .unwrap();

    assert_eq!(result.summary.total_direct_dependencies, 3);
    assert_eq!(result.summary.total_transitive_dependencies, 2);
    assert_eq!(result.summary.vulnerability_count, 0);
    assert_eq!(result.ecosystems, vec!["cargo"]);
    assert_eq!(result.confidence, None);

    let direct_only = ManifestDependencyMapper
        .map_dependencies(dir.path(), &dependency_params(false))
        .await
        .unwrap();
    assert_eq!(direct_only.summary.total_transitive_dependencies, 0);
}

#[tokio::test]
async fn test_mixed_ecosystems() {
    let dir = project(&[
        (
            "package.json",
            r#"{"dependencies": {"react": "^18"}, "devDependencies": {"vite": "^5"}}"#,
        ),
        (
            "package-lock.json",
            r#"{"packages": {"": {}, "node_modules/react": {}, "node_modules/vite": {}, "node_modules/loose-envify": {}}}"#,
        ),
        ("requirements.txt", "flask==3.0\nrequests>=2\n"),
    ]);

    let result = ManifestDependencyMapper
        .map_dependencies(dir.path(), &dependency_params(true))
        .await
        .unwrap();

    assert_eq!(result.summary.total_direct_dependencies, 4);
    assert_eq!(result.summary.total_transitive_dependencies, 1);
    assert_eq!(result.ecosystems, vec!["npm", "pip"]);
}

#[tokio::test]
async fn test_no_manifests_reports_nothing() {
    let dir = tempdir().unwrap();

    let result = ManifestDependencyMapper
        .map_dependencies(dir.path(), &dependency_params(true))
        .await
        .unwrap();

    assert_eq!(result.summary.total_direct_dependencies, 0);
    assert!(result.ecosystems.is_empty());
}

#[tokio::test]
async fn test_malformed_package_json_fails() {
    let dir = project(&[("package.json", "{ not json")]);

    let err = ManifestDependencyMapper
        .map_dependencies(dir.path(), &dependency_params(false))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Malformed package.json"));
}

// ============================================================================
// Git Context Analyzer
// ============================================================================

#[tokio::test]
async fn test_directory_without_history() {
    let dir = project(&[("README.md", "# demo\n")]);
    let params = ContextParams {
        depth: AnalysisDepth::Quick,
        include_developer_profiles: false,
    };

    match GitContextAnalyzer::default()
        .analyze_context(dir.path(), &params)
        .await
    {
        Ok(context) => {
            assert!(context.total_contributors as u64 <= context.total_commits);
            assert!(context.bus_factor <= context.total_contributors);
        }
        // No git on this machine
        Err(AnalyzerFailure::Unavailable { tool, .. }) => assert_eq!(tool, "git"),
        Err(other) => panic!("unexpected failure: {}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_timed_out_git_call_kills_child() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    let bin = tempdir().unwrap();
    let project_dir = tempdir().unwrap();
    let marker = bin.path().join("still_running");
    let script = bin.path().join("fake-git");
    fs::write(
        &script,
        format!("#!/bin/sh\nsleep 1\ntouch '{}'\n", marker.display()),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let analyzer = GitContextAnalyzer::with_binary(&script);
    let params = ContextParams {
        depth: AnalysisDepth::Quick,
        include_developer_profiles: false,
    };

    let result = tokio::time::timeout(
        Duration::from_millis(200),
        analyzer.analyze_context(project_dir.path(), &params),
    )
    .await;
    assert!(result.is_err(), "fake git should outlast the timeout");

    // Past the point where a surviving child would have written the marker
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_missing_git_binary_is_unavailable() {
    let dir = tempdir().unwrap();
    let params = ContextParams {
        depth: AnalysisDepth::Deep,
        include_developer_profiles: true,
    };

    let err = GitContextAnalyzer::with_binary("/nonexistent/bin/git-does-not-exist")
        .analyze_context(dir.path(), &params)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerFailure::Unavailable { ref tool, .. } if tool == "git"));
}
