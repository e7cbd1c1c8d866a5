#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use init_gate::{ClientRuntime, FromDocument, InitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
   pub gateway: String,
}

impl ClusterConfig {
   pub fn new(gateway: &str) -> Self {
      Self {
         gateway: gateway.to_string(),
      }
   }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "bad client config: {}", self.0)
   }
}

impl std::error::Error for ParseError {}

/// Accepts documents of the form `gateway = host:port`.
impl FromDocument for ClusterConfig {
   type Error = ParseError;

   fn from_document(contents: &str) -> Result<Self, ParseError> {
      contents
         .lines()
         .filter_map(|line| line.split_once('='))
         .find(|(key, _)| key.trim() == "gateway")
         .map(|(_, value)| ClusterConfig::new(value.trim()))
         .ok_or_else(|| ParseError("missing gateway".to_string()))
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterError(pub String);

impl fmt::Display for ClusterError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "cluster unreachable: {}", self.0)
   }
}

impl std::error::Error for ClusterError {}

/// Scriptable stand-in for a cluster client.
#[derive(Default)]
pub struct MockRuntime {
   ready: AtomicBool,
   calls: AtomicUsize,
   in_flight: AtomicUsize,
   max_in_flight: AtomicUsize,
   failures_left: AtomicUsize,
   delays: Mutex<VecDeque<Duration>>,
   default_delay: Duration,
   gateways: Mutex<Vec<String>>,
}

impl MockRuntime {
   pub fn new() -> Self {
      Self::default()
   }

   /// Every `initialize` call sleeps for `delay` unless a scripted delay is queued.
   pub fn with_delay(mut self, delay: Duration) -> Self {
      self.default_delay = delay;
      self
   }

   /// Delays for the first calls, in order.
   pub fn with_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
      self.delays.lock().unwrap().extend(delays);
      self
   }

   /// The first `n` calls fail.
   pub fn failing(self, n: usize) -> Self {
      self.failures_left.store(n, Ordering::SeqCst);
      self
   }

   pub fn always_failing(self) -> Self {
      self.failing(usize::MAX)
   }

   pub fn already_initialized(self) -> Self {
      self.ready.store(true, Ordering::SeqCst);
      self
   }

   pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
   }

   pub fn max_in_flight(&self) -> usize {
      self.max_in_flight.load(Ordering::SeqCst)
   }

   pub fn gateways(&self) -> Vec<String> {
      self.gateways.lock().unwrap().clone()
   }
}

impl ClientRuntime for MockRuntime {
   type Config = ClusterConfig;
   type Error = ClusterError;

   fn is_initialized(&self) -> bool {
      self.ready.load(Ordering::Acquire)
   }

   async fn initialize(&self, config: &ClusterConfig) -> Result<(), ClusterError> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
      self.gateways.lock().unwrap().push(config.gateway.clone());

      let delay = self
         .delays
         .lock()
         .unwrap()
         .pop_front()
         .unwrap_or(self.default_delay);
      if !delay.is_zero() {
         tokio::time::sleep(delay).await;
      }

      let fail = self
         .failures_left
         .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
            (left > 0).then(|| if left == usize::MAX { left } else { left - 1 })
         })
         .is_ok();

      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      if fail {
         return Err(ClusterError(format!("attempt {call}")));
      }
      self.ready.store(true, Ordering::Release);
      Ok(())
   }
}

/// Error type of the test pipelines.
#[derive(Debug)]
pub enum AppError {
   Init(InitError<ClusterError>),
   Handler(String),
}

impl From<InitError<ClusterError>> for AppError {
   fn from(err: InitError<ClusterError>) -> Self {
      Self::Init(err)
   }
}
