//! Client configuration sources.
//!
//! A [`ConfigSource`] is what the application hands to the registration
//! surface. It is resolved once, at registration time, into an [`InitConfig`]
//! that the guard keeps for the lifetime of the pipeline. Resolution of the
//! default source is the only step that touches the filesystem before the
//! first request arrives.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::ConfigError;
use crate::runtime::FromDocument;

/// File name of the default configuration document, looked up next to the
/// running executable.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "ClientConfiguration.xml";

/// A resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitConfig<C> {
   /// A fully formed in-memory configuration.
   Value(C),
   /// A configuration document read and parsed on each initialization attempt.
   Document(PathBuf),
}

impl<C: FromDocument> InitConfig<C> {
   /// Produces the configuration value for one initialization attempt.
   pub async fn load(&self) -> Result<LoadedConfig<'_, C>, ConfigError> {
      match self {
         Self::Value(value) => Ok(LoadedConfig::Borrowed(value)),
         Self::Document(path) => load_document(path).await.map(LoadedConfig::Owned),
      }
   }
}

/// Configuration value for a single attempt: borrowed from an in-memory
/// [`InitConfig::Value`] or freshly parsed from a document.
#[derive(Debug)]
pub enum LoadedConfig<'a, C> {
   /// Borrowed from an in-memory configuration.
   Borrowed(&'a C),
   /// Parsed from a document for this attempt.
   Owned(C),
}

impl<C> Deref for LoadedConfig<'_, C> {
   type Target = C;

   fn deref(&self) -> &C {
      match self {
         Self::Borrowed(value) => value,
         Self::Owned(value) => value,
      }
   }
}

/// Reads and parses a configuration document.
pub async fn load_document<C: FromDocument>(path: &Path) -> Result<C, ConfigError> {
   debug!(path = %path.display(), "loading client config document");
   let contents = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| ConfigError::Read {
         path: path.to_path_buf(),
         source,
      })?;
   C::from_document(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source: Box::new(source),
   })
}

/// Where the client configuration comes from, as given at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource<C> {
   /// Look for [`DEFAULT_CONFIG_FILE_NAME`] in the install directory.
   Default,
   /// Use this value directly.
   Value(C),
   /// Read and parse this document when initializing.
   Document(PathBuf),
}

impl<C> ConfigSource<C> {
   /// Resolves the source against the running program's install directory.
   pub fn resolve(self) -> Result<InitConfig<C>, ConfigError> {
      if matches!(self, Self::Default) {
         return self.resolve_in(&install_dir()?);
      }
      self.resolve_in(Path::new(""))
   }

   /// Resolves the source against an explicit install directory.
   ///
   /// Only [`ConfigSource::Default`] consults `install_dir`; it fails with
   /// [`ConfigError::NotFound`] if the default document does not exist there.
   pub fn resolve_in(self, install_dir: &Path) -> Result<InitConfig<C>, ConfigError> {
      match self {
         Self::Value(value) => Ok(InitConfig::Value(value)),
         Self::Document(path) => Ok(InitConfig::Document(path)),
         Self::Default => {
            let path = install_dir.join(DEFAULT_CONFIG_FILE_NAME);
            if !path.is_file() {
               error!(path = %path.display(), "client config file not found");
               return Err(ConfigError::NotFound { path });
            }
            Ok(InitConfig::Document(path))
         }
      }
   }
}

impl<C> Default for ConfigSource<C> {
   fn default() -> Self {
      Self::Default
   }
}

impl<C> From<C> for ConfigSource<C> {
   fn from(value: C) -> Self {
      Self::Value(value)
   }
}

/// Returns the directory containing the running executable.
pub fn install_dir() -> Result<PathBuf, ConfigError> {
   let exe = std::env::current_exe().map_err(ConfigError::InstallDir)?;
   let exe = exe.canonicalize().unwrap_or(exe);
   exe.parent().map(Path::to_path_buf).ok_or_else(|| {
      ConfigError::InstallDir(std::io::Error::new(
         std::io::ErrorKind::NotFound,
         format!("executable path {} has no parent directory", exe.display()),
      ))
   })
}
