//! Filesystem and git backed analyzers.
//!
//! Simple heuristics over file names, directory names, manifests and
//! `git log`. Filesystem walks run on the blocking pool; git runs as a child
//! process.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{
    ArchitectureDetector, ArchitectureParams, ArchitectureResult, ClassificationResult,
    Classifier, ClassifyParams, ContextAnalyzer, ContextParams, ContextResult, DependencyMapper,
    DependencyParams, DependencyResult, DependencySummary,
};
use crate::cycle::AnalysisDepth;
use crate::error::{AnalyzerFailure, AnalyzerResultOf};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "vendor",
    "dist",
    "build",
    "__pycache__",
    "venv",
];

/// Manifest file name and the tool it implies.
const MANIFESTS: &[(&str, &str)] = &[
    ("Cargo.toml", "cargo"),
    ("package.json", "npm"),
    ("requirements.txt", "pip"),
    ("pyproject.toml", "pip"),
    ("go.mod", "go-modules"),
    ("pom.xml", "maven"),
    ("Gemfile", "bundler"),
    ("Dockerfile", "docker"),
    ("Makefile", "make"),
];

fn walk_depth(depth: AnalysisDepth) -> usize {
    match depth {
        AnalysisDepth::Quick => 2,
        AnalysisDepth::Standard => 4,
        AnalysisDepth::Deep => 8,
    }
}

fn language_for(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" | "cxx" => "cpp",
        "swift" => "swift",
        _ => return None,
    };
    Some(language)
}

// ============================================================================
// Tree Scan
// ============================================================================

/// What a bounded walk of the project tree found.
#[derive(Debug, Clone, Default)]
struct TreeScan {
    file_count: usize,
    test_files: usize,
    config_files: usize,
    /// File count per detected language
    languages: HashMap<&'static str, usize>,
    /// Lowercased names of every visited directory
    dir_names: BTreeSet<String>,
    root_files: BTreeSet<String>,
}

impl TreeScan {
    /// Languages ordered by file count, most used first.
    fn ranked_languages(&self) -> Vec<String> {
        let mut languages: Vec<(&str, usize)> =
            self.languages.iter().map(|(l, n)| (*l, *n)).collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        languages.into_iter().map(|(l, _)| l.to_string()).collect()
    }

    fn has_dir(&self, name: &str) -> bool {
        self.dir_names.contains(name)
    }

    fn has_root_file(&self, name: &str) -> bool {
        self.root_files.contains(name)
    }
}

fn scan_tree(root: &Path, max_depth: usize) -> std::io::Result<TreeScan> {
    let mut scan = TreeScan::default();
    let mut stack: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];

    while let Some((dir, level)) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // Only the root must be readable
            Err(e) if level == 0 => return Err(e),
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                    continue;
                }
                scan.dir_names.insert(name.to_lowercase());
                if level + 1 < max_depth {
                    stack.push((entry.path(), level + 1));
                }
                continue;
            }

            scan.file_count += 1;
            if level == 0 {
                scan.root_files.insert(name.clone());
            }

            let lower = name.to_lowercase();
            let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
            if let Some(language) = language_for(extension) {
                *scan.languages.entry(language).or_insert(0) += 1;
            }
            if lower.contains("test") || lower.contains("spec.") {
                scan.test_files += 1;
            }
            if matches!(extension, "toml" | "yaml" | "yml" | "ini" | "cfg" | "conf")
                || lower.starts_with(".env")
            {
                scan.config_files += 1;
            }
        }
    }

    Ok(scan)
}

async fn scan_project(project: &Path, depth: AnalysisDepth) -> AnalyzerResultOf<TreeScan> {
    let root = project.to_path_buf();
    let max_depth = walk_depth(depth);
    let scan = tokio::task::spawn_blocking(move || scan_tree(&root, max_depth))
        .await
        .map_err(|e| AnalyzerFailure::failed(format!("Project scan aborted: {}", e)))??;
    Ok(scan)
}

// ============================================================================
// Classifier
// ============================================================================

/// Classifies a project from its file tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsClassifier;

impl FsClassifier {
    fn project_type(scan: &TreeScan) -> (&'static str, Vec<String>) {
        let mut indicators = vec![
            format!("files: {}", scan.file_count),
            format!("test files: {}", scan.test_files),
        ];

        let legacy = scan.has_dir("legacy") || scan.has_dir("deprecated");
        if legacy {
            indicators.push("legacy directories".to_string());
        }

        let project_type = if scan.file_count <= 10 {
            "greenfield"
        } else if legacy || scan.file_count > 1000 {
            "brownfield"
        } else if scan.test_files == 0 {
            "prototype"
        } else {
            "ongoing"
        };
        (project_type, indicators)
    }

    fn complexity(scan: &TreeScan) -> u32 {
        let mut complexity = 1;

        complexity += match scan.file_count {
            n if n > 10_000 => 4,
            n if n > 5_000 => 3,
            n if n > 1_000 => 2,
            n if n > 100 => 1,
            _ => 0,
        };
        complexity += match scan.languages.len() {
            n if n > 5 => 3,
            n if n > 3 => 2,
            n if n > 1 => 1,
            _ => 0,
        };
        complexity += match scan.config_files {
            n if n > 10 => 2,
            n if n > 5 => 1,
            _ => 0,
        };
        if scan.file_count > 0 && scan.test_files * 10 > scan.file_count * 3 {
            complexity += 1;
        }

        complexity.min(10)
    }
}

#[async_trait]
impl Classifier for FsClassifier {
    async fn classify(
        &self,
        project: &Path,
        params: &ClassifyParams,
    ) -> AnalyzerResultOf<ClassificationResult> {
        let scan = scan_project(project, params.depth).await?;
        let (project_type, indicators) = Self::project_type(&scan);

        let mut tech_stack = scan.ranked_languages();
        if params.include_dependencies {
            for (manifest, tool) in MANIFESTS {
                if scan.has_root_file(manifest) && !tech_stack.iter().any(|t| t.as_str() == *tool) {
                    tech_stack.push(tool.to_string());
                }
            }
        }

        let confidence = if scan.file_count == 0 {
            0.3
        } else {
            match params.depth {
                AnalysisDepth::Quick => 0.6,
                AnalysisDepth::Standard => 0.75,
                AnalysisDepth::Deep => 0.85,
            }
        };

        debug!(
            files = scan.file_count,
            project_type,
            languages = scan.languages.len(),
            "Project classified"
        );

        Ok(ClassificationResult {
            project_type: project_type.to_string(),
            confidence: Some(confidence),
            complexity_score: Self::complexity(&scan),
            tech_stack,
            indicators,
        })
    }
}

// ============================================================================
// Architecture Detector
// ============================================================================

/// Pattern name and the directory names that indicate it.
const PATTERN_INDICATORS: &[(&str, &[&str])] = &[
    ("mvc", &["models", "views", "controllers"]),
    ("layered", &["presentation", "services", "repositories", "domain"]),
    ("hexagonal", &["ports", "adapters", "domain", "infrastructure"]),
    ("microservices", &["services", "gateway", "deploy", "k8s"]),
    ("component-based", &["components", "widgets", "shared"]),
    ("api-first", &["api", "routes", "handlers", "openapi"]),
    ("plugin", &["plugins", "extensions", "addons"]),
];

/// Framework name and the dependency names that reveal it.
const FRAMEWORKS: &[(&str, &[&str])] = &[
    ("axum", &["axum"]),
    ("actix-web", &["actix-web"]),
    ("rocket", &["rocket"]),
    ("react", &["\"react\""]),
    ("vue", &["\"vue\""]),
    ("angular", &["@angular/core"]),
    ("express", &["\"express\""]),
    ("django", &["django"]),
    ("flask", &["flask"]),
    ("fastapi", &["fastapi"]),
];

/// Secondary patterns must score above this.
const SECONDARY_PATTERN_SCORE: f64 = 0.3;

/// Detects architecture patterns from directory names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArchitectureDetector;

impl FsArchitectureDetector {
    fn pattern_scores(scan: &TreeScan) -> Vec<(&'static str, f64)> {
        let mut scores: Vec<(&'static str, f64)> = PATTERN_INDICATORS
            .iter()
            .map(|(pattern, dirs)| {
                let hits = dirs.iter().filter(|d| scan.has_dir(d)).count();
                (*pattern, hits as f64 / dirs.len() as f64)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort keeps declaration order on ties
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores
    }

    async fn framework_from_manifests(project: &Path) -> Option<String> {
        let mut contents = String::new();
        for manifest in ["Cargo.toml", "package.json", "requirements.txt", "pyproject.toml"] {
            if let Ok(text) = tokio::fs::read_to_string(project.join(manifest)).await {
                contents.push_str(&text.to_lowercase());
                contents.push('\n');
            }
        }

        FRAMEWORKS
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| contents.contains(n)))
            .map(|(name, _)| name.to_string())
    }
}

#[async_trait]
impl ArchitectureDetector for FsArchitectureDetector {
    async fn detect(
        &self,
        project: &Path,
        params: &ArchitectureParams,
    ) -> AnalyzerResultOf<ArchitectureResult> {
        let scan = scan_project(project, AnalysisDepth::Standard).await?;
        let scores = Self::pattern_scores(&scan);

        let (primary_pattern, confidence) = match scores.first() {
            Some((pattern, score)) => (pattern.to_string(), (0.5 + 0.4 * score).min(0.9)),
            None => ("monolithic".to_string(), 0.4),
        };
        let secondary_patterns = scores
            .iter()
            .skip(1)
            .filter(|(_, score)| *score > SECONDARY_PATTERN_SCORE)
            .map(|(pattern, _)| pattern.to_string())
            .collect();

        let framework = if params.framework_specific {
            let from_stack = params.prior_classification.as_ref().and_then(|c| {
                c.tech_stack
                    .iter()
                    .find(|t| FRAMEWORKS.iter().any(|(name, _)| *name == t.as_str()))
                    .cloned()
            });
            match from_stack {
                Some(framework) => Some(framework),
                None => Self::framework_from_manifests(project).await,
            }
        } else {
            None
        };

        let mut concerns = Vec::new();
        if !scan.has_dir("tests") && !scan.has_dir("test") && scan.test_files == 0 {
            concerns.push("No dedicated test directory".to_string());
        }
        if scan.file_count > 0 && scan.dir_names.is_empty() {
            concerns.push("Flat project layout".to_string());
        }

        Ok(ArchitectureResult {
            primary_pattern,
            secondary_patterns,
            confidence: Some(confidence),
            framework,
            concerns,
        })
    }
}

// ============================================================================
// Dependency Mapper
// ============================================================================

/// Counts dependencies declared in manifests and locked in lockfiles.
///
/// Vulnerability and license checks need an advisory service and always
/// report zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestDependencyMapper;

/// Dependency names declared in a `Cargo.toml`.
fn cargo_dependencies(manifest: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut in_table = false;

    for line in manifest.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let header = header.trim();
            in_table = false;
            for table in [
                "dependencies",
                "dev-dependencies",
                "build-dependencies",
                "workspace.dependencies",
            ] {
                if header == table {
                    in_table = true;
                } else if let Some(name) = header.strip_prefix(&format!("{}.", table)) {
                    names.insert(name.trim().to_string());
                }
            }
            continue;
        }
        if in_table {
            if let Some((name, _)) = line.split_once('=') {
                names.insert(name.trim().trim_matches('"').to_string());
            }
        }
    }

    names
}

/// Number of `[[package]]` entries in a `Cargo.lock`.
fn cargo_locked_packages(lockfile: &str) -> usize {
    lockfile
        .lines()
        .filter(|line| line.trim() == "[[package]]")
        .count()
}

fn npm_dependencies(manifest: &serde_json::Value) -> BTreeSet<String> {
    ["dependencies", "devDependencies", "peerDependencies", "optionalDependencies"]
        .iter()
        .filter_map(|section| manifest.get(section).and_then(|v| v.as_object()))
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}

fn npm_locked_packages(lockfile: &serde_json::Value) -> usize {
    if let Some(packages) = lockfile.get("packages").and_then(|v| v.as_object()) {
        // The "" key is the root project itself
        return packages.keys().filter(|k| !k.is_empty()).count();
    }
    lockfile
        .get("dependencies")
        .and_then(|v| v.as_object())
        .map(|deps| deps.len())
        .unwrap_or(0)
}

fn requirements(manifest: &str) -> BTreeSet<String> {
    manifest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(|line| {
            line.split(|c: char| "=<>!~;[ ".contains(c))
                .next()
                .unwrap_or(line)
                .to_lowercase()
        })
        .collect()
}

async fn read_optional(path: PathBuf) -> AnalyzerResultOf<Option<String>> {
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AnalyzerFailure::failed(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn parse_json(name: &str, text: &str) -> AnalyzerResultOf<serde_json::Value> {
    serde_json::from_str(text)
        .map_err(|e| AnalyzerFailure::failed(format!("Malformed {}: {}", name, e)))
}

#[async_trait]
impl DependencyMapper for ManifestDependencyMapper {
    async fn map_dependencies(
        &self,
        project: &Path,
        params: &DependencyParams,
    ) -> AnalyzerResultOf<DependencyResult> {
        let mut direct = 0usize;
        let mut transitive = 0usize;
        let mut ecosystems = Vec::new();

        if let Some(manifest) = read_optional(project.join("Cargo.toml")).await? {
            let names = cargo_dependencies(&manifest);
            direct += names.len();
            ecosystems.push("cargo".to_string());
            if params.include_transitive {
                if let Some(lock) = read_optional(project.join("Cargo.lock")).await? {
                    // The lockfile also lists the root package
                    transitive += cargo_locked_packages(&lock).saturating_sub(names.len() + 1);
                }
            }
        }

        if let Some(manifest) = read_optional(project.join("package.json")).await? {
            let names = npm_dependencies(&parse_json("package.json", &manifest)?);
            direct += names.len();
            ecosystems.push("npm".to_string());
            if params.include_transitive {
                if let Some(lock) = read_optional(project.join("package-lock.json")).await? {
                    let locked = npm_locked_packages(&parse_json("package-lock.json", &lock)?);
                    transitive += locked.saturating_sub(names.len());
                }
            }
        }

        if let Some(manifest) = read_optional(project.join("requirements.txt")).await? {
            direct += requirements(&manifest).len();
            ecosystems.push("pip".to_string());
        }

        debug!(
            direct,
            transitive,
            ecosystems = ?ecosystems,
            check_vulnerabilities = params.check_vulnerabilities,
            "Dependencies mapped"
        );

        Ok(DependencyResult {
            summary: DependencySummary {
                total_direct_dependencies: direct as u32,
                total_transitive_dependencies: transitive as u32,
                vulnerability_count: 0,
                license_issues: 0,
            },
            ecosystems,
            confidence: None,
        })
    }
}

// ============================================================================
// Git Context Analyzer
// ============================================================================

/// Mines commit authorship with `git log`.
#[derive(Debug, Clone)]
pub struct GitContextAnalyzer {
    git: PathBuf,
}

impl Default for GitContextAnalyzer {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
        }
    }
}

impl GitContextAnalyzer {
    /// Use a specific git executable.
    pub fn with_binary(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    fn commit_limit(depth: AnalysisDepth) -> Option<u32> {
        match depth {
            AnalysisDepth::Quick => Some(200),
            AnalysisDepth::Standard => Some(1000),
            AnalysisDepth::Deep => None,
        }
    }
}

/// Smallest number of authors that together made at least half the commits.
pub fn bus_factor<'a>(authors: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for author in authors {
        *counts.entry(author).or_insert(0) += 1;
    }
    let total: u64 = counts.values().sum();

    let mut per_author: Vec<u64> = counts.into_values().collect();
    per_author.sort_unstable_by(|a, b| b.cmp(a));

    let mut covered = 0;
    let mut factor = 0;
    for commits in per_author {
        if covered * 2 >= total {
            break;
        }
        covered += commits;
        factor += 1;
    }
    factor
}

#[async_trait]
impl ContextAnalyzer for GitContextAnalyzer {
    async fn analyze_context(
        &self,
        project: &Path,
        params: &ContextParams,
    ) -> AnalyzerResultOf<ContextResult> {
        let mut command = Command::new(&self.git);
        // Killed when a timed-out call drops this future
        command
            .kill_on_drop(true)
            .arg("-C")
            .arg(project)
            .args(["log", "--no-merges", "--format=%ae"]);
        if let Some(limit) = Self::commit_limit(params.depth) {
            command.arg(format!("--max-count={}", limit));
        }

        let output = command.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AnalyzerFailure::Unavailable {
                tool: "git".to_string(),
                message: e.to_string(),
            },
            _ => AnalyzerFailure::from(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let no_history = stderr.contains("not a git repository")
                || stderr.contains("does not have any commits");
            if !no_history {
                return Err(AnalyzerFailure::failed(format!(
                    "git log failed: {}",
                    stderr.trim()
                )));
            }
            return Ok(ContextResult {
                total_commits: 0,
                total_contributors: 0,
                bus_factor: 0,
                confidence: None,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let authors: Vec<&str> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let contributors: BTreeSet<&str> = authors.iter().copied().collect();

        debug!(
            commits = authors.len(),
            contributors = contributors.len(),
            developer_profiles = params.include_developer_profiles,
            "Git history analyzed"
        );

        Ok(ContextResult {
            total_commits: authors.len() as u64,
            total_contributors: contributors.len() as u32,
            bus_factor: bus_factor(authors.iter().copied()),
            confidence: None,
        })
    }
}
