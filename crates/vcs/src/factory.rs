use crate::backend::{bzr::BzrRepo, git::GitRepo, hg::HgRepo, svn::SvnRepo};
use crate::detect::{detect_local, Detector};
use crate::error::VcsError;
use crate::traits::{Existence, Getter, HookManager, RevReader, Updater, VcsBackend};
use crate::types::{BackendType, RebaseMode, RefOp, RemoteMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-backend URL schemes tried, in order, for remotes written without one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeDefaults {
    pub git: Vec<String>,
    pub hg: Vec<String>,
    pub svn: Vec<String>,
    pub bzr: Vec<String>,
}

fn owned(schemes: &[&str]) -> Vec<String> {
    schemes.iter().map(|s| s.to_string()).collect()
}

impl Default for SchemeDefaults {
    fn default() -> Self {
        Self {
            git: owned(&["git", "https", "http", "git+ssh"]),
            hg: owned(&["https", "http", "ssh"]),
            svn: owned(&["https", "http", "svn", "svn+ssh"]),
            bzr: owned(&["https", "http", "bzr", "bzr+ssh"]),
        }
    }
}

impl SchemeDefaults {
    pub fn for_backend(&self, backend: BackendType) -> &[String] {
        match backend {
            BackendType::Git => &self.git,
            BackendType::Hg => &self.hg,
            BackendType::Svn => &self.svn,
            BackendType::Bzr => &self.bzr,
        }
    }
}

/// Configuration for a VCS backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    /// Remote location; empty to use whatever a local clone is configured with
    pub remote: String,
    pub local_path: PathBuf,
    /// Skip detection and use this backend
    pub backend_type: Option<BackendType>,
    /// Replaces the backend's default scheme list
    pub schemes: Option<Vec<String>>,
    pub scheme_defaults: SchemeDefaults,
    /// Name of the remote in git clones, `origin` when unset
    pub remote_name: Option<String>,
    pub remote_mode: RemoteMode,
    /// git: keep a bare `--mirror` clone
    pub mirror: bool,
    /// git: rebase behaviour of pulls
    pub rebase: RebaseMode,
    /// git: when non-empty, an update applies these ref operations instead
    /// of fetching and pulling
    pub refs: BTreeMap<String, RefOp>,
    /// Executable to run instead of the backend's default tool
    pub tool: Option<String>,
}

impl VcsConfig {
    pub fn new(remote: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote: remote.into(),
            local_path: local_path.into(),
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend_type = Some(backend);
        self
    }
}

/// Factory for creating VCS backends
pub struct VcsFactory;

impl VcsFactory {
    /// Resolve the backend and the remote to use for `config`.
    ///
    /// An explicit backend type short-circuits detection; otherwise the
    /// default [`Detector`] is used.
    pub fn detect(config: &VcsConfig) -> Result<(BackendType, String), VcsError> {
        if let Some(backend) = config.backend_type {
            return Ok((backend, config.remote.clone()));
        }
        Self::detect_with(&Detector::new()?, config)
    }

    pub fn detect_with(
        detector: &Detector,
        config: &VcsConfig,
    ) -> Result<(BackendType, String), VcsError> {
        detector.detect(&config.remote, &config.local_path, config.backend_type)
    }

    /// Create a backend, auto-detecting the type when the config has none
    pub fn create(config: &VcsConfig) -> Result<Box<dyn VcsBackend>, VcsError> {
        let (backend, remote) = Self::detect(config)?;
        Self::build(backend, remote, config)
    }

    pub fn create_with(
        detector: &Detector,
        config: &VcsConfig,
    ) -> Result<Box<dyn VcsBackend>, VcsError> {
        let (backend, remote) = Self::detect_with(detector, config)?;
        Self::build(backend, remote, config)
    }

    pub fn getter(config: &VcsConfig) -> Result<Box<dyn Getter>, VcsError> {
        let backend = Self::create(config)?;
        Ok(backend)
    }

    pub fn getter_with(detector: &Detector, config: &VcsConfig) -> Result<Box<dyn Getter>, VcsError> {
        let backend = Self::create_with(detector, config)?;
        Ok(backend)
    }

    pub fn updater(config: &VcsConfig) -> Result<Box<dyn Updater>, VcsError> {
        let backend = Self::create(config)?;
        Ok(backend)
    }

    pub fn updater_with(
        detector: &Detector,
        config: &VcsConfig,
    ) -> Result<Box<dyn Updater>, VcsError> {
        let backend = Self::create_with(detector, config)?;
        Ok(backend)
    }

    pub fn reader(config: &VcsConfig) -> Result<Box<dyn RevReader>, VcsError> {
        let backend = Self::create(config)?;
        Ok(backend)
    }

    pub fn reader_with(
        detector: &Detector,
        config: &VcsConfig,
    ) -> Result<Box<dyn RevReader>, VcsError> {
        let backend = Self::create_with(detector, config)?;
        Ok(backend)
    }

    pub fn existence(config: &VcsConfig) -> Result<Box<dyn Existence>, VcsError> {
        let backend = Self::create(config)?;
        Ok(backend)
    }

    pub fn existence_with(
        detector: &Detector,
        config: &VcsConfig,
    ) -> Result<Box<dyn Existence>, VcsError> {
        let backend = Self::create_with(detector, config)?;
        Ok(backend)
    }

    /// Hook manager for an existing local repository. Only the explicit type
    /// or the local directory decide the backend; the remote is not consulted.
    pub fn hook_manager(config: &VcsConfig) -> Result<Box<dyn HookManager>, VcsError> {
        let backend = match config.backend_type {
            Some(backend) => backend,
            None => detect_local(&config.local_path)?,
        };
        let backend = Self::build(backend, config.remote.clone(), config)?;
        Ok(backend)
    }

    fn build(
        backend: BackendType,
        remote: String,
        config: &VcsConfig,
    ) -> Result<Box<dyn VcsBackend>, VcsError> {
        let mut config = config.clone();
        config.remote = remote;
        tracing::debug!(
            "Creating {} backend for {:?} at {}",
            backend,
            config.remote,
            config.local_path.display()
        );

        let repo: Box<dyn VcsBackend> = match backend {
            BackendType::Git => Box::new(GitRepo::from_config(&config)?),
            BackendType::Hg => Box::new(HgRepo::from_config(&config)?),
            BackendType::Svn => Box::new(SvnRepo::from_config(&config)?),
            BackendType::Bzr => Box::new(BzrRepo::from_config(&config)?),
        };
        Ok(repo)
    }
}
