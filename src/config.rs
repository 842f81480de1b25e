//! # Configuration Schema and Loading
//!
//! This module defines the YAML configuration file of `docset-updater` and
//! resolves it into the immutable values the rest of the library consumes:
//! one [`Source`] per tracked project and one [`DocSetConfig`] per shared
//! documentation set.
//!
//! ## Format
//!
//! ```yaml
//! docsets:
//!   - name: Vault
//!     path: ~/Dash-User-Contributions/docsets/Vault
//!
//! projects:
//!   - name: vault
//!     preset: vault
//!     path: ~/vault-dash
//!     repository_path: ~/vault-dash/vault
//!     git_url: git@github.com:hashicorp/vault.git
//!     minimum_version: "1.0.0"
//! ```
//!
//! ## Presets
//!
//! A `preset` fills in the per-project details of the upstream projects this
//! tool was written for (tag prefix, stability policy, build command, archive
//! name, discovery strategy). Any field set explicitly overrides the preset.
//!
//! ## Paths
//!
//! A leading `~` expands to the home directory. Relative paths are resolved
//! against the directory containing the configuration file, except `ledger`
//! and `output_folder`, which are relative to the project's `path`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::build::BuildSpec;
use crate::error::{Error, Result};
use crate::pipeline::{Discovery, VersionPolicy};
use crate::version::{TagNormalizer, Version};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Build command used when neither the project nor its preset names one.
pub const DEFAULT_BUILD_COMMAND: &str = "./build.sh {version}";

/// Default build output folder, relative to the generator root.
pub const DEFAULT_OUTPUT_FOLDER: &str = "build";

/// Pattern locating the version in Terraform's website configuration.
const TERRAFORM_VERSION_PATTERN: &str = r#"h.version\s*=\s*"(\S*)""#;

/// Built-in project definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Kubernetes,
    Consul,
    Vault,
    Packer,
    Terraform,
}

impl Preset {
    fn display_name(self) -> &'static str {
        match self {
            Preset::Kubernetes => "Kubernetes",
            Preset::Consul => "Consul",
            Preset::Vault => "Vault",
            Preset::Packer => "Packer",
            Preset::Terraform => "Terraform",
        }
    }

    fn stable_only(self) -> bool {
        matches!(self, Preset::Consul | Preset::Vault)
    }

    fn tag_prefix(self) -> Option<&'static str> {
        match self {
            Preset::Terraform => None,
            _ => Some("v"),
        }
    }

    fn command(self) -> &'static str {
        match self {
            Preset::Kubernetes => "source env/bin/activate && ./build.sh {version}",
            _ => DEFAULT_BUILD_COMMAND,
        }
    }

    fn ledger_file(self) -> String {
        format!("{}.yml", self.display_name().to_lowercase())
    }

    fn archive(self) -> String {
        format!("{}.tgz", self.display_name())
    }

    fn discovery(self) -> Option<DiscoveryEntry> {
        match self {
            Preset::Terraform => Some(DiscoveryEntry::Content {
                file: "content/config.rb".to_string(),
                pattern: TERRAFORM_VERSION_PATTERN.to_string(),
            }),
            _ => None,
        }
    }
}

/// How versions are discovered, as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryEntry {
    /// Every repository tag.
    Tags,
    /// A version embedded in `file`, extracted by the first capture group of
    /// `pattern`.
    Content { file: String, pattern: String },
}

/// A doc-set as written in the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocSetEntry {
    pub name: String,
    pub path: String,
}

/// A project as written in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub preset: Option<Preset>,
    /// Generator root: the build command runs here.
    pub path: Option<String>,
    /// Where the upstream clone lives.
    pub repository_path: Option<String>,
    pub git_url: Option<String>,
    pub minimum_version: Option<String>,
    pub stable_only: Option<bool>,
    /// Prefix stripped from tags before parsing; empty disables stripping.
    pub tag_prefix: Option<String>,
    pub command: Option<String>,
    pub ledger: Option<String>,
    pub output_folder: Option<String>,
    pub archive: Option<String>,
    /// Doc-set the built archives are merged into.
    pub docset: Option<String>,
    pub ssh_username: Option<String>,
    /// Either `tags` or a `content:` map with `file` and `pattern`.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub discovery: Option<DiscoveryEntry>,
}

/// The configuration file as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub docsets: Vec<DocSetEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// A resolved doc-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSetConfig {
    pub name: String,
    pub root_path: PathBuf,
}

/// A resolved project. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Source {
    pub identifier: String,
    pub generator_root_path: PathBuf,
    pub clone_path: PathBuf,
    pub remote_url: String,
    pub minimum_version: Option<Version>,
    pub stability_required: bool,
    pub tag_normalizer: TagNormalizer,
    pub build_command_template: String,
    pub ledger_path: PathBuf,
    pub build_output_folder: PathBuf,
    pub archive_file_name: String,
    pub discovery: Discovery,
    pub ssh_username: Option<String>,
    /// Name of the doc-set this project feeds, if any.
    pub doc_set: Option<String>,
}

impl Source {
    pub fn build_spec(&self) -> BuildSpec {
        BuildSpec {
            generator_root: self.generator_root_path.clone(),
            command_template: self.build_command_template.clone(),
            build_output_folder: self.build_output_folder.clone(),
            archive_file_name: self.archive_file_name.clone(),
        }
    }

    pub fn version_policy(&self) -> VersionPolicy {
        VersionPolicy {
            minimum_version: self.minimum_version.clone(),
            stability_required: self.stability_required,
            normalizer: self.tag_normalizer.clone(),
        }
    }
}

/// The resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub docsets: Vec<DocSetConfig>,
    pub sources: Vec<Source>,
}

impl Config {
    pub fn docset(&self, name: &str) -> Option<&DocSetConfig> {
        self.docsets.iter().find(|d| d.name == name)
    }

    /// Restricts the configuration to the named projects, keeping their
    /// configured order. An empty list keeps every project.
    pub fn select(mut self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        for name in names {
            if !self.sources.iter().any(|s| &s.identifier == name) {
                return Err(Error::ConfigParse {
                    message: format!("Unknown project '{}'", name),
                    hint: Some(format!(
                        "Configured projects: {}",
                        self.sources
                            .iter()
                            .map(|s| s.identifier.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                });
            }
        }
        self.sources.retain(|s| names.contains(&s.identifier));
        Ok(self)
    }
}

/// Expands a leading `~` and resolves relative paths against `base`.
pub fn resolve_path(raw: &str, base: &Path) -> PathBuf {
    let expanded = if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else if let Some(rest) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        }
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn missing(project: &str, field: &str) -> Error {
    Error::ConfigParse {
        message: format!("Project '{}' is missing required field '{}'", project, field),
        hint: Some(format!("Add '{}:' to the project, or use a preset that provides it", field)),
    }
}

fn resolve_discovery(project: &str, entry: Option<DiscoveryEntry>) -> Result<Discovery> {
    match entry.unwrap_or(DiscoveryEntry::Tags) {
        DiscoveryEntry::Tags => Ok(Discovery::TagBased),
        DiscoveryEntry::Content { file, pattern } => {
            let pattern = Regex::new(&pattern)?;
            if pattern.captures_len() < 2 {
                return Err(Error::ConfigParse {
                    message: format!(
                        "Project '{}': content pattern '{}' has no capture group",
                        project,
                        pattern.as_str()
                    ),
                    hint: Some("Wrap the version part of the pattern in parentheses".to_string()),
                });
            }
            Ok(Discovery::ContentDerived { file, pattern })
        }
    }
}

fn resolve_project(entry: ProjectEntry, base: &Path, docsets: &[DocSetConfig]) -> Result<Source> {
    let name = entry.name;
    let preset = entry.preset;

    let generator_root_path = resolve_path(entry.path.as_deref().ok_or_else(|| missing(&name, "path"))?, base);
    let clone_path = resolve_path(
        entry
            .repository_path
            .as_deref()
            .ok_or_else(|| missing(&name, "repository_path"))?,
        base,
    );
    let remote_url = entry.git_url.ok_or_else(|| missing(&name, "git_url"))?;

    let minimum_version = entry
        .minimum_version
        .as_deref()
        .map(Version::parse)
        .transpose()
        .map_err(|e| Error::ConfigParse {
            message: format!("Project '{}' has an invalid minimum_version: {}", name, e),
            hint: None,
        })?;

    let tag_prefix = entry
        .tag_prefix
        .or_else(|| preset.and_then(Preset::tag_prefix).map(str::to_string));
    let tag_normalizer = match tag_prefix {
        Some(prefix) if !prefix.is_empty() => TagNormalizer::StripPrefix(prefix),
        _ => TagNormalizer::Identity,
    };

    let ledger = entry
        .ledger
        .or_else(|| preset.map(Preset::ledger_file))
        .unwrap_or_else(|| format!("{}.yml", name));
    let archive_file_name = entry
        .archive
        .or_else(|| preset.map(Preset::archive))
        .ok_or_else(|| missing(&name, "archive"))?;

    let doc_set = match entry.docset {
        Some(docset) => {
            if !docsets.iter().any(|d| d.name == docset) {
                return Err(Error::ConfigParse {
                    message: format!("Project '{}' refers to unknown docset '{}'", name, docset),
                    hint: Some("Declare it under 'docsets:'".to_string()),
                });
            }
            Some(docset)
        }
        None => preset
            .map(Preset::display_name)
            .filter(|display| docsets.iter().any(|d| d.name == *display))
            .map(str::to_string),
    };

    Ok(Source {
        discovery: resolve_discovery(&name, entry.discovery.or_else(|| preset.and_then(Preset::discovery)))?,
        ledger_path: resolve_path(&ledger, &generator_root_path),
        build_output_folder: PathBuf::from(
            entry
                .output_folder
                .unwrap_or_else(|| DEFAULT_OUTPUT_FOLDER.to_string()),
        ),
        build_command_template: entry
            .command
            .unwrap_or_else(|| preset.map_or(DEFAULT_BUILD_COMMAND, Preset::command).to_string()),
        stability_required: entry
            .stable_only
            .unwrap_or_else(|| preset.is_some_and(Preset::stable_only)),
        identifier: name,
        generator_root_path,
        clone_path,
        remote_url,
        minimum_version,
        tag_normalizer,
        archive_file_name,
        ssh_username: entry.ssh_username,
        doc_set,
    })
}

/// Resolves a parsed configuration file. `base` anchors relative paths.
pub fn resolve(file: ConfigFile, base: &Path) -> Result<Config> {
    let mut seen = HashSet::new();
    let mut docsets = Vec::with_capacity(file.docsets.len());
    for entry in file.docsets {
        if !seen.insert(entry.name.clone()) {
            return Err(Error::ConfigParse {
                message: format!("Docset '{}' is declared twice", entry.name),
                hint: None,
            });
        }
        docsets.push(DocSetConfig {
            root_path: resolve_path(&entry.path, base),
            name: entry.name,
        });
    }

    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(file.projects.len());
    for entry in file.projects {
        if !seen.insert(entry.name.clone()) {
            return Err(Error::ConfigParse {
                message: format!("Project '{}' is declared twice", entry.name),
                hint: None,
            });
        }
        sources.push(resolve_project(entry, base, &docsets)?);
    }

    Ok(Config { docsets, sources })
}

/// Parses and resolves configuration YAML.
pub fn parse(yaml_content: &str, base: &Path) -> Result<Config> {
    let file: ConfigFile = serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: None,
    })?;
    resolve(file, base)
}

/// Loads configuration from a YAML file; relative paths resolve against the
/// file's directory.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("Cannot read {}: {}", path.display(), e),
        hint: Some("Pass --config or set DOCSET_UPDATER_CONFIG".to_string()),
    })?;
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parse(&content, &base)
}
