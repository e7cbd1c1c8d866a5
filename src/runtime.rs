//! Interfaces consumed from the client runtime and its configuration.

use core::future::Future;

/// A shared client runtime that must be initialized once before use.
///
/// The runtime is typically a process-wide connection to a remote cluster held
/// behind an `Arc`. Its `initialize` routine is not assumed to be idempotent;
/// [`InitGuard`](crate::InitGuard) guarantees it is invoked at most once per
/// successful initialization.
pub trait ClientRuntime: Send + Sync {
   /// Configuration consumed by `initialize`.
   type Config: FromDocument + Send + Sync;
   /// Error raised by a failed `initialize`.
   type Error: std::error::Error + Send + Sync + 'static;

   /// Whether the runtime is already usable.
   fn is_initialized(&self) -> bool;

   /// Performs the one-shot initialization.
   ///
   /// On success, `is_initialized` must report `true` afterwards. On failure the
   /// runtime must remain uninitialized so another attempt can be made.
   fn initialize(
      &self,
      config: &Self::Config,
   ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Parses a configuration value out of a configuration document.
///
/// The document format is owned by the implementor.
pub trait FromDocument: Sized {
   /// Error raised when the document is malformed.
   type Error: std::error::Error + Send + Sync + 'static;

   /// Parses the full text of a configuration document.
   fn from_document(contents: &str) -> Result<Self, Self::Error>;
}
