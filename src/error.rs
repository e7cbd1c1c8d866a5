//! Error types for registration and initialization.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by a [`FromDocument`](crate::FromDocument) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to resolve or load a client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// No explicit configuration was given and the default document is absent.
   #[error("cannot find client config file for initialization at {}", path.display())]
   NotFound { path: PathBuf },
   /// The running program's install directory could not be determined.
   #[error("cannot resolve the install directory of the running program")]
   InstallDir(#[source] io::Error),
   /// The configuration document could not be read.
   #[error("failed to read client config file at {}", path.display())]
   Read {
      path: PathBuf,
      #[source]
      source: io::Error,
   },
   /// The configuration document was read but did not parse.
   #[error("failed to parse client config file at {}", path.display())]
   Parse {
      path: PathBuf,
      #[source]
      source: BoxError,
   },
}

/// Failure of a request to get past the initialization gate.
///
/// `E` is the error type of the guarded [`ClientRuntime`](crate::ClientRuntime).
#[derive(Debug, Error)]
pub enum InitError<E> {
   /// The configuration document could not be loaded for this attempt.
   #[error(transparent)]
   Config(#[from] ConfigError),
   /// The runtime's own initialization routine failed.
   #[error("client runtime initialization failed")]
   Runtime(#[source] E),
   /// A previous attempt failed recently and the guard's retry cooldown is active.
   #[error("client runtime initialization failed recently, next attempt allowed in {remaining:?}")]
   CoolingDown { remaining: Duration },
}

impl<E> InitError<E> {
   /// Returns the runtime's error if this is a [`InitError::Runtime`] failure.
   pub fn runtime_error(&self) -> Option<&E> {
      match self {
         Self::Runtime(err) => Some(err),
         _ => None,
      }
   }
}
