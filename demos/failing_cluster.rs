use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use init_gate::{ClientRuntime, FromDocument, GateStatus, InitConfig, InitError, InitGuard};
use tokio::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
struct ClusterConfig;

impl FromDocument for ClusterConfig {
   type Error = Infallible;

   fn from_document(_contents: &str) -> Result<Self, Infallible> {
      Ok(Self)
   }
}

/// Refuses the first two connection attempts.
#[derive(Default)]
struct FlakyClient {
   ready: AtomicBool,
   attempts: AtomicUsize,
}

impl ClientRuntime for FlakyClient {
   type Config = ClusterConfig;
   type Error = std::io::Error;

   fn is_initialized(&self) -> bool {
      self.ready.load(Ordering::Acquire)
   }

   async fn initialize(&self, _config: &ClusterConfig) -> Result<(), std::io::Error> {
      if self.attempts.fetch_add(1, Ordering::Relaxed) < 2 {
         return Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "gateway refused connection",
         ));
      }
      self.ready.store(true, Ordering::Release);
      Ok(())
   }
}

#[tokio::main]
async fn main() {
   fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
      .with_writer(std::io::stderr)
      .init();

   let guard = InitGuard::new(
      Arc::new(FlakyClient::default()),
      InitConfig::Value(ClusterConfig),
   )
   .with_retry_cooldown(Duration::from_millis(200));

   // First attempt fails and reopens the gate.
   match guard.ensure_ready().await {
      Err(InitError::Runtime(err)) => println!("Caught error: {err}"),
      other => panic!("Should have failed: {other:?}"),
   }
   assert_eq!(guard.status(), GateStatus::Uninitialized);

   // Within the cooldown no attempt is made.
   match guard.ensure_ready().await {
      Err(InitError::CoolingDown { remaining }) => println!("Cooling down for {remaining:?}"),
      other => panic!("Should be cooling down: {other:?}"),
   }

   tokio::time::sleep(Duration::from_millis(250)).await;
   assert!(guard.ensure_ready().await.is_err()); // Second refusal

   tokio::time::sleep(Duration::from_millis(250)).await;
   guard.ensure_ready().await.expect("third attempt connects");
   assert_eq!(guard.status(), GateStatus::Ready);
   assert_eq!(guard.attempts(), 3);

   // Ready gates never call initialize again.
   guard.ensure_ready().await.unwrap();
   assert_eq!(guard.attempts(), 3);
   println!("Connected after {} attempts", guard.attempts());
}
