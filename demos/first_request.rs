use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use init_gate::{ClientRuntime, ConfigSource, FromDocument, InitError, PipelineBuilder};
use tokio::time::{sleep, Duration};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
struct ClusterConfig {
   gateway: String,
}

impl FromDocument for ClusterConfig {
   type Error = Infallible;

   fn from_document(contents: &str) -> Result<Self, Infallible> {
      Ok(Self {
         gateway: contents.trim().to_string(),
      })
   }
}

#[derive(Default)]
struct ClusterClient {
   ready: AtomicBool,
   connects: AtomicUsize,
}

impl ClientRuntime for ClusterClient {
   type Config = ClusterConfig;
   type Error = std::io::Error;

   fn is_initialized(&self) -> bool {
      self.ready.load(Ordering::Acquire)
   }

   async fn initialize(&self, config: &ClusterConfig) -> Result<(), std::io::Error> {
      self.connects.fetch_add(1, Ordering::Relaxed);
      println!("Connecting to cluster gateway {}...", config.gateway);
      sleep(Duration::from_millis(100)).await;
      self.ready.store(true, Ordering::Release);
      Ok(())
   }
}

#[derive(Debug)]
struct AppError(InitError<std::io::Error>);

impl From<InitError<std::io::Error>> for AppError {
   fn from(err: InitError<std::io::Error>) -> Self {
      Self(err)
   }
}

#[tokio::main]
async fn main() {
   fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .with_writer(std::io::stderr)
      .init();

   let client = Arc::new(ClusterClient::default());
   let config = ClusterConfig {
      gateway: "10.0.0.1:30000".to_string(),
   };

   let pipeline = Arc::new(
      PipelineBuilder::new()
         .use_init_guard(Arc::clone(&client), ConfigSource::Value(config))
         .expect("in-memory config always resolves")
         .build(|path: String| async move { Ok::<_, AppError>(format!("200 OK {path}")) }),
   );

   let requests: Vec<_> = (0..5)
      .map(|i| {
         let pipeline = Arc::clone(&pipeline);
         tokio::spawn(async move { pipeline.dispatch(format!("/grains/{i}")).await })
      })
      .collect();

   for request in requests {
      println!("Response: {}", request.await.unwrap().unwrap());
   }

   assert!(client.is_initialized());
   assert_eq!(client.connects.load(Ordering::Relaxed), 1); // Connected only once
}
