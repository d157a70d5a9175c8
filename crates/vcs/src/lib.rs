//! Uniform client over git, Mercurial, Subversion and Bazaar
//!
//! This crate provides a trait-based abstraction over version control systems.
//! The backend of a repository is detected from its remote location (known
//! hosts, URL extensions, `go-import` vanity documents), from a local working
//! copy, or given explicitly.
//!
//! # Design Goals
//!
//! - **Capability traits**: callers depend on `Getter`, `RevReader` and
//!   friends, never on a concrete backend
//! - **Command ledger**: every operation reports the external commands it ran
//!   and their output, successful or not
//! - **No global state**: tools run with explicit directory arguments and the
//!   process working directory is never changed
//!
//! # Example
//!
//! ```no_run
//! use vcs::{Existence, Getter, Location, ReadScope, RevReader, VcsConfig, VcsFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VcsConfig::new("https://github.com/owner/repo", "/tmp/checkout");
//!
//! let repo = VcsFactory::create(&config)?;
//! if repo.exists(Location::Local)?.0.is_none() {
//!     let results = repo.get(None)?;
//!     println!("{results}");
//! }
//! let (revisions, _) = repo.rev_read(ReadScope::CoreOnly, None)?;
//! println!("At {}", revisions[0].core());
//! # Ok(())
//! # }
//! ```

mod error;
mod exists;
mod factory;
mod revision;
mod runner;
mod traits;
mod types;

pub mod backend;
pub mod detect;

pub use backend::{bzr::BzrRepo, git::GitRepo, hg::HgRepo, svn::SvnRepo, Description};
pub use detect::{Detector, HostRule, HttpClient, HttpResponse, ReqwestClient, Resolution};
pub use error::{ErrorKind, VcsError};
pub use exists::{probe_remote, scheme_of};
pub use factory::{SchemeDefaults, VcsConfig, VcsFactory};
pub use revision::{is_sem_ver, ReadScope, Revision, UserInfo, UserRole};
pub use runner::{run, run_in_dir, CommandResult, Ledger};
pub use traits::{
    Describe, Existence, Getter, HookManager, RevReader, RevSetter, Updater, VcsBackend,
};
pub use types::{
    BackendType, InstallMode, Location, RebaseMode, RefOp, RemoteMode, Rev, UnknownBackend,
};
