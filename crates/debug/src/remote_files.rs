//! Remote-file mirror seam.
//!
//! Workspace file mirroring for remote sessions lives outside this crate;
//! the debug service only consumes the mapping surface: translate breakpoint
//! paths, fetch remote scripts, and materialize scratch files such as the
//! script listing shown when a stop reports no source.

use std::io;
use std::path::{Path, PathBuf};

pub trait RemoteFileMirror: Send + Sync {
	/// Maps a remote path to its mirrored local file, if one exists.
	fn map_to_local(&self, remote_path: &str) -> Option<PathBuf>;

	/// Maps a local file to the path the remote session knows it by.
	/// Breakpoints on unmapped files are dropped.
	fn map_to_remote(&self, local_path: &Path) -> Option<String>;

	/// Downloads a remote file into the mirror and returns the local path.
	fn fetch(&self, remote_path: &str) -> io::Result<PathBuf>;

	/// Creates (or overwrites) a named scratch file for this session.
	fn create_temporary_file(&self, name: &str, contents: &str) -> io::Result<PathBuf>;

	/// True when `path` lives under the session scratch directory.
	fn is_under_remote_temp_path(&self, path: &Path) -> bool;
}

/// Mirror for purely local sessions: paths pass through untranslated and
/// scratch files land in a per-session temp directory that lives as long as
/// this value.
pub struct LocalSessionFiles {
	scratch: tempfile::TempDir,
}

impl LocalSessionFiles {
	pub fn new() -> io::Result<Self> {
		Ok(Self {
			scratch: tempfile::Builder::new().prefix("posh-session-").tempdir()?,
		})
	}

	pub fn scratch_dir(&self) -> &Path {
		self.scratch.path()
	}
}

impl RemoteFileMirror for LocalSessionFiles {
	fn map_to_local(&self, remote_path: &str) -> Option<PathBuf> {
		Some(PathBuf::from(remote_path))
	}

	fn map_to_remote(&self, local_path: &Path) -> Option<String> {
		Some(local_path.to_string_lossy().into_owned())
	}

	fn fetch(&self, remote_path: &str) -> io::Result<PathBuf> {
		Ok(PathBuf::from(remote_path))
	}

	fn create_temporary_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
		let path = self.scratch.path().join(name);
		std::fs::write(&path, contents)?;
		Ok(path)
	}

	fn is_under_remote_temp_path(&self, path: &Path) -> bool {
		path.starts_with(self.scratch.path())
	}
}
