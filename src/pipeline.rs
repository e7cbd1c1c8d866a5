//! A minimal async request pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s followed by an endpoint.
//! Each stage receives the request context and a [`Next`] continuation for the
//! rest of the pipeline; it may do work before and after calling
//! [`Next::run`], or return without calling it at all.

use core::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::debug;

use crate::config::{ConfigSource, InitConfig};
use crate::error::{ConfigError, InitError};
use crate::guard::InitGuard;
use crate::runtime::ClientRuntime;

type Endpoint<Ctx, T, E> = dyn Fn(Ctx) -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// One step of a request pipeline.
pub trait Stage<Ctx, T, E>: Send + Sync {
   /// Handles `ctx`, calling `next` to continue down the pipeline.
   fn call<'a>(&'a self, ctx: Ctx, next: Next<'a, Ctx, T, E>) -> BoxFuture<'a, Result<T, E>>;
}

impl<S, Ctx, T, E> Stage<Ctx, T, E> for Arc<S>
where
   S: Stage<Ctx, T, E> + ?Sized,
{
   #[inline]
   fn call<'a>(&'a self, ctx: Ctx, next: Next<'a, Ctx, T, E>) -> BoxFuture<'a, Result<T, E>> {
      (**self).call(ctx, next)
   }
}

impl<R, Ctx, T, E> Stage<Ctx, T, E> for InitGuard<R>
where
   R: ClientRuntime,
   Ctx: Send + 'static,
   T: Send + 'static,
   E: From<InitError<R::Error>> + Send + 'static,
{
   fn call<'a>(&'a self, ctx: Ctx, next: Next<'a, Ctx, T, E>) -> BoxFuture<'a, Result<T, E>> {
      self.handle(ctx, move |ctx| next.run(ctx)).boxed()
   }
}

/// The rest of the pipeline after the current stage.
pub struct Next<'a, Ctx, T, E> {
   stages: &'a [Arc<dyn Stage<Ctx, T, E>>],
   endpoint: &'a Endpoint<Ctx, T, E>,
}

impl<'a, Ctx, T, E> Next<'a, Ctx, T, E>
where
   Ctx: Send + 'static,
   T: Send + 'static,
   E: Send + 'static,
{
   /// Runs the remaining stages and the endpoint.
   pub fn run(self, ctx: Ctx) -> BoxFuture<'a, Result<T, E>> {
      match self.stages.split_first() {
         Some((stage, stages)) => stage.call(
            ctx,
            Next {
               stages,
               endpoint: self.endpoint,
            },
         ),
         None => (self.endpoint)(ctx),
      }
   }
}

/// Collects stages in registration order.
pub struct PipelineBuilder<Ctx, T, E> {
   stages: Vec<Arc<dyn Stage<Ctx, T, E>>>,
}

impl<Ctx, T, E> PipelineBuilder<Ctx, T, E>
where
   Ctx: Send + 'static,
   T: Send + 'static,
   E: Send + 'static,
{
   /// Creates a builder with no stages.
   #[must_use]
   pub fn new() -> Self {
      Self { stages: Vec::new() }
   }

   /// Appends a stage. Stages run in the order they are added.
   #[must_use]
   pub fn stage<S>(mut self, stage: S) -> Self
   where
      S: Stage<Ctx, T, E> + 'static,
   {
      self.stages.push(Arc::new(stage));
      self
   }

   /// Inserts an [`InitGuard`] for `runtime` at this position.
   ///
   /// Register it before any stage that uses the runtime. The configuration
   /// source is resolved now: with [`ConfigSource::Default`] and no
   /// configuration document next to the executable this fails with
   /// [`ConfigError::NotFound`] and nothing is installed.
   pub fn use_init_guard<R>(
      self,
      runtime: Arc<R>,
      source: ConfigSource<R::Config>,
   ) -> Result<Self, ConfigError>
   where
      R: ClientRuntime + 'static,
      E: From<InitError<R::Error>>,
   {
      let config = source.resolve()?;
      debug!(config_kind = kind(&config), "registering client runtime init guard");
      Ok(self.stage(InitGuard::new(runtime, config)))
   }

   /// Like [`use_init_guard`](Self::use_init_guard), resolving the default
   /// configuration document in `install_dir` instead of the executable's
   /// directory.
   pub fn use_init_guard_in<R>(
      self,
      runtime: Arc<R>,
      source: ConfigSource<R::Config>,
      install_dir: &Path,
   ) -> Result<Self, ConfigError>
   where
      R: ClientRuntime + 'static,
      E: From<InitError<R::Error>>,
   {
      let config = source.resolve_in(install_dir)?;
      debug!(config_kind = kind(&config), "registering client runtime init guard");
      Ok(self.stage(InitGuard::new(runtime, config)))
   }

   /// Finishes the pipeline with the handler that serves the request.
   pub fn build<F, Fut>(self, endpoint: F) -> Pipeline<Ctx, T, E>
   where
      F: Fn(Ctx) -> Fut + Send + Sync + 'static,
      Fut: Future<Output = Result<T, E>> + Send + 'static,
   {
      Pipeline {
         stages: self.stages,
         endpoint: Box::new(move |ctx| endpoint(ctx).boxed()),
      }
   }
}

impl<Ctx, T, E> Default for PipelineBuilder<Ctx, T, E>
where
   Ctx: Send + 'static,
   T: Send + 'static,
   E: Send + 'static,
{
   fn default() -> Self {
      Self::new()
   }
}

/// A built pipeline, shareable between request handlers.
pub struct Pipeline<Ctx, T, E> {
   stages: Vec<Arc<dyn Stage<Ctx, T, E>>>,
   endpoint: Box<Endpoint<Ctx, T, E>>,
}

impl<Ctx, T, E> Pipeline<Ctx, T, E>
where
   Ctx: Send + 'static,
   T: Send + 'static,
   E: Send + 'static,
{
   /// Runs `ctx` through every stage and the endpoint.
   pub async fn dispatch(&self, ctx: Ctx) -> Result<T, E> {
      Next {
         stages: &self.stages,
         endpoint: &*self.endpoint,
      }
      .run(ctx)
      .await
   }

   /// Number of registered stages, not counting the endpoint.
   pub fn len(&self) -> usize {
      self.stages.len()
   }

   /// Whether no stages are registered.
   pub fn is_empty(&self) -> bool {
      self.stages.is_empty()
   }
}

fn kind<C>(config: &InitConfig<C>) -> &'static str {
   match config {
      InitConfig::Value(_) => "value",
      InitConfig::Document(_) => "document",
   }
}
