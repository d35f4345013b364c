//! Package manager handlers
//!
//! Workspace discovery is delegated to self-describing strategies: each
//! handler knows how to recognize its own configuration (`is_configured`)
//! and how to enumerate packages from it. The orchestrator never hardcodes
//! a package-manager switch; new managers are added by registering another
//! handler.
//!
//! Exactly one handler must match a workspace root. Zero matches means the
//! root is not a recognized workspace; multiple matches are ambiguous.
//! Either case is a fatal configuration error raised before any package
//! runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// The scorecard binary packages run through, when no local one is found.
const GLOBAL_BINARY: &str = "scorecard";

/// One workspace member, ready to run.
#[derive(Debug, Clone)]
pub struct PackageHandle {
    pub name: String,
    pub directory: PathBuf,
    /// Resolved scorecard binary for this package (local script or global)
    pub binary: String,
}

/// A self-describing package-manager strategy.
pub trait PackageManagerHandler: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether this handler recognizes the workspace root.
    fn is_configured(&self, root: &Path) -> bool;

    /// Enumerate workspace packages, each with a resolved binary.
    fn list_packages(&self, root: &Path) -> Result<Vec<PackageHandle>>;

    /// Binary-resolution strategy for one package directory.
    fn resolve_binary(&self, package_dir: &Path) -> String;
}

/// Registry of handlers; selection requires exactly one match.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn PackageManagerHandler>>,
}

impl HandlerRegistry {
    /// Empty registry; callers register their own handlers.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with the built-in handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NpmWorkspacesHandler));
        registry.register(Box::new(CargoWorkspacesHandler));
        registry
    }

    /// Add a handler.
    pub fn register(&mut self, handler: Box<dyn PackageManagerHandler>) {
        debug!("Registering package manager handler: {}", handler.name());
        self.handlers.push(handler);
    }

    /// Select the single handler matching this root.
    pub fn select(&self, root: &Path) -> Result<&dyn PackageManagerHandler, ConfigError> {
        let matched: Vec<&dyn PackageManagerHandler> = self
            .handlers
            .iter()
            .filter(|h| h.is_configured(root))
            .map(|h| h.as_ref())
            .collect();

        match matched.as_slice() {
            [] => Err(ConfigError::NoHandlerMatched {
                root: root.to_path_buf(),
            }),
            [handler] => Ok(*handler),
            many => Err(ConfigError::AmbiguousHandlers {
                root: root.to_path_buf(),
                matched: many.iter().map(|h| h.name().to_string()).collect(),
            }),
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Expand workspace member patterns relative to a root.
///
/// Supports the common forms real manifests use: a literal directory, or a
/// `dir/*` glob meaning every direct subdirectory. A subdirectory counts
/// only if `marker` (its manifest file) exists in it.
fn expand_members(root: &Path, patterns: &[String], marker: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for pattern in patterns {
        if let Some(prefix) = pattern.strip_suffix("/*") {
            let base = root.join(prefix);
            let Ok(entries) = std::fs::read_dir(&base) else {
                continue;
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir() && p.join(marker).is_file())
                .collect();
            found.sort();
            dirs.extend(found);
        } else {
            let dir = root.join(pattern);
            if dir.join(marker).is_file() {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// npm workspaces: `package.json` with a `workspaces` field.
pub struct NpmWorkspacesHandler;

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    workspaces: Option<Workspaces>,
}

/// npm accepts both an array and an object with a `packages` key.
#[derive(Deserialize)]
#[serde(untagged)]
enum Workspaces {
    Patterns(Vec<String>),
    Object { packages: Vec<String> },
}

impl Workspaces {
    fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Patterns(p) => p,
            Workspaces::Object { packages } => packages,
        }
    }
}

fn read_package_json(path: &Path) -> Result<PackageJson> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {path:?}"))
}

impl PackageManagerHandler for NpmWorkspacesHandler {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn is_configured(&self, root: &Path) -> bool {
        read_package_json(&root.join("package.json"))
            .map(|pkg| pkg.workspaces.is_some())
            .unwrap_or(false)
    }

    fn list_packages(&self, root: &Path) -> Result<Vec<PackageHandle>> {
        let manifest = read_package_json(&root.join("package.json"))?;
        let patterns = manifest
            .workspaces
            .as_ref()
            .map(Workspaces::patterns)
            .unwrap_or_default();

        expand_members(root, patterns, "package.json")
            .into_iter()
            .map(|dir| {
                let name = read_package_json(&dir.join("package.json"))?
                    .name
                    .unwrap_or_else(|| dir_name(&dir));
                Ok(PackageHandle {
                    binary: self.resolve_binary(&dir),
                    name,
                    directory: dir,
                })
            })
            .collect()
    }

    fn resolve_binary(&self, package_dir: &Path) -> String {
        // Prefer the package's locally installed script over the global one
        let local = package_dir.join("node_modules/.bin").join(GLOBAL_BINARY);
        if local.is_file() {
            local.to_string_lossy().to_string()
        } else {
            GLOBAL_BINARY.to_string()
        }
    }
}

/// Cargo workspaces: root `Cargo.toml` with a `[workspace]` table.
pub struct CargoWorkspacesHandler;

#[derive(Deserialize)]
struct CargoManifest {
    #[serde(default)]
    workspace: Option<CargoWorkspace>,
    #[serde(default)]
    package: Option<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoWorkspace {
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
}

fn read_cargo_manifest(path: &Path) -> Result<CargoManifest> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    toml::from_str(&content).with_context(|| format!("parsing {path:?}"))
}

impl PackageManagerHandler for CargoWorkspacesHandler {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn is_configured(&self, root: &Path) -> bool {
        read_cargo_manifest(&root.join("Cargo.toml"))
            .map(|m| m.workspace.is_some())
            .unwrap_or(false)
    }

    fn list_packages(&self, root: &Path) -> Result<Vec<PackageHandle>> {
        let manifest = read_cargo_manifest(&root.join("Cargo.toml"))?;
        let members = manifest.workspace.map(|w| w.members).unwrap_or_default();

        expand_members(root, &members, "Cargo.toml")
            .into_iter()
            .map(|dir| {
                let name = read_cargo_manifest(&dir.join("Cargo.toml"))?
                    .package
                    .map(|p| p.name)
                    .unwrap_or_else(|| dir_name(&dir));
                Ok(PackageHandle {
                    binary: self.resolve_binary(&dir),
                    name,
                    directory: dir,
                })
            })
            .collect()
    }

    fn resolve_binary(&self, _package_dir: &Path) -> String {
        GLOBAL_BINARY.to_string()
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.to_string_lossy().to_string())
}
