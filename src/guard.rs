//! The initialization gate placed in front of a request pipeline.
//!
//! [`InitGuard`] makes sure a shared [`ClientRuntime`] is initialized exactly
//! once, by whichever request reaches it first, and that no request proceeds
//! to the rest of the pipeline before initialization has completed.
//!
//! Once the gate is ready every request pays a single atomic load. Before
//! that, requests serialize on the gate lock: the first one initializes, the
//! others wait and then observe the result. A failed attempt does not poison
//! the gate; it returns to uninitialized and the next request through the lock
//! tries again.
//!
//! There is no timeout on `initialize`. If it hangs, every request waiting on
//! the gate hangs with it; wrap the dispatch in `tokio::time::timeout` if that
//! matters for the caller. Dropping a request that is mid-initialization
//! releases the gate for the next one.

use core::future::Future;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::{fmt, time::Duration};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::InitConfig;
use crate::error::InitError;
use crate::runtime::ClientRuntime;
use crate::state::GateState;

/// Readiness of the runtime as seen by an [`InitGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
   /// No successful initialization yet, and none in progress.
   Uninitialized,
   /// Some request is inside the initialization critical section.
   Initializing,
   /// Initialization completed. Terminal.
   Ready,
}

/// Gate that initializes a shared client runtime on first use.
///
/// The guard owns its readiness flag and lock, so independent guards never
/// share state. Share one guard between request handlers via `Arc` (or by
/// registering it once on a [`PipelineBuilder`](crate::PipelineBuilder)).
pub struct InitGuard<R: ClientRuntime> {
   runtime: Arc<R>,
   config: InitConfig<R::Config>,
   state: GateState,
   attempts: AtomicUsize,
   retry_cooldown: Option<Duration>,
   last_failure: Mutex<Option<Instant>>,
}

impl<R: ClientRuntime> InitGuard<R> {
   /// Creates a new, uninitialized guard for `runtime`.
   #[must_use]
   pub fn new(runtime: Arc<R>, config: InitConfig<R::Config>) -> Self {
      Self {
         runtime,
         config,
         state: GateState::new(),
         attempts: AtomicUsize::new(0),
         retry_cooldown: None,
         last_failure: Mutex::new(None),
      }
   }

   /// Suppresses new initialization attempts for `cooldown` after a failed one.
   ///
   /// Requests reaching the gate inside the window fail with
   /// [`InitError::CoolingDown`] instead of calling `initialize`. Without a
   /// cooldown every request that finds the gate uninitialized makes a fresh
   /// attempt.
   #[must_use]
   pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
      self.retry_cooldown = Some(cooldown);
      self
   }

   /// The guarded runtime.
   #[inline]
   pub fn runtime(&self) -> &Arc<R> {
      &self.runtime
   }

   /// The configuration handed to `initialize`.
   #[inline]
   pub fn config(&self) -> &InitConfig<R::Config> {
      &self.config
   }

   /// Checks whether initialization has completed. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Current readiness. Never blocks.
   pub fn status(&self) -> GateStatus {
      if self.is_ready() {
         GateStatus::Ready
      } else if self.state.is_locked() {
         GateStatus::Initializing
      } else {
         GateStatus::Uninitialized
      }
   }

   /// Number of times this guard has invoked `initialize`.
   #[inline]
   pub fn attempts(&self) -> usize {
      self.attempts.load(Ordering::Relaxed)
   }

   /// Ensures the runtime is initialized, initializing it if this is the first
   /// request to get through the gate.
   ///
   /// - If the gate is ready, returns `Ok(())` immediately without locking.
   /// - Otherwise waits for the gate lock, re-checks, and runs `initialize`:
   ///     - On success, marks the gate ready and returns `Ok(())`.
   ///     - On failure, leaves the gate uninitialized and returns the error.
   #[inline]
   pub async fn ensure_ready(&self) -> Result<(), InitError<R::Error>> {
      if self.is_ready() {
         return Ok(());
      }
      self.initialize_slow().await
   }

   /// Runs `next` once the runtime is initialized.
   ///
   /// Initialization failures are converted into the pipeline's error type and
   /// `next` is not called. Anything `next` returns is passed back untouched.
   pub async fn handle<Ctx, F, Fut, T, E>(&self, ctx: Ctx, next: F) -> Result<T, E>
   where
      F: FnOnce(Ctx) -> Fut,
      Fut: Future<Output = Result<T, E>>,
      E: From<InitError<R::Error>>,
   {
      self.ensure_ready().await?;
      next(ctx).await
   }

   /// Cold path for `ensure_ready`. Acquires the gate lock and initializes.
   #[cold]
   async fn initialize_slow(&self) -> Result<(), InitError<R::Error>> {
      debug!("client runtime not ready, waiting for initialization lock");
      let Some(guard) = self.state.lock_async().await else {
         debug!("client runtime initialized by a concurrent request");
         return Ok(());
      };

      if self.runtime.is_initialized() {
         debug!("client runtime already initialized outside the gate");
         guard.commit();
         return Ok(());
      }

      if let Some(remaining) = self.cooldown_remaining() {
         warn!(?remaining, "client runtime initialization suppressed by retry cooldown");
         return Err(InitError::CoolingDown { remaining });
      }

      // Dropping `guard` on any early return below reopens the gate.
      let config = match self.config.load().await {
         Ok(config) => config,
         Err(err) => {
            self.record_failure();
            warn!(error = %err, "client config could not be loaded");
            return Err(err.into());
         }
      };

      let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
      let started = Instant::now();
      info!(attempt, "initializing client runtime");

      match self.runtime.initialize(&config).await {
         Ok(()) => {
            guard.commit();
            info!(
               attempt,
               elapsed = ?started.elapsed(),
               "client runtime initialized"
            );
            Ok(())
         }
         Err(err) => {
            self.record_failure();
            warn!(attempt, error = %err, "client runtime initialization failed");
            Err(InitError::Runtime(err))
         }
      }
   }

   /// Time left in the retry cooldown, if one is configured and active.
   fn cooldown_remaining(&self) -> Option<Duration> {
      let cooldown = self.retry_cooldown?;
      let last_failure = (*self.last_failure.lock().unwrap_or_else(PoisonError::into_inner))?;
      cooldown
         .checked_sub(last_failure.elapsed())
         .filter(|remaining| !remaining.is_zero())
   }

   /// Starts the retry cooldown, if one is configured.
   fn record_failure(&self) {
      if self.retry_cooldown.is_some() {
         *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
      }
   }
}

impl<R> fmt::Debug for InitGuard<R>
where
   R: ClientRuntime,
   R::Config: fmt::Debug,
{
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("InitGuard")
         .field("status", &self.status())
         .field("config", &self.config)
         .field("attempts", &self.attempts())
         .field("retry_cooldown", &self.retry_cooldown)
         .finish_non_exhaustive()
   }
}
