use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use init_gate::{
   install_dir, ClientRuntime, ConfigError, ConfigSource, FromDocument, InitError, PipelineBuilder,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug)]
struct MissingGateway;

impl std::fmt::Display for MissingGateway {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str("config document has no gateway")
   }
}

impl std::error::Error for MissingGateway {}

#[derive(Debug)]
struct ClusterConfig {
   gateway: String,
}

impl FromDocument for ClusterConfig {
   type Error = MissingGateway;

   fn from_document(contents: &str) -> Result<Self, MissingGateway> {
      let gateway = contents.lines().next().ok_or(MissingGateway)?;
      Ok(Self {
         gateway: gateway.trim().to_string(),
      })
   }
}

#[derive(Default)]
struct ClusterClient {
   ready: AtomicBool,
}

impl ClientRuntime for ClusterClient {
   type Config = ClusterConfig;
   type Error = std::io::Error;

   fn is_initialized(&self) -> bool {
      self.ready.load(Ordering::Acquire)
   }

   async fn initialize(&self, config: &ClusterConfig) -> Result<(), std::io::Error> {
      println!("Connecting to {}", config.gateway);
      self.ready.store(true, Ordering::Release);
      Ok(())
   }
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
   fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .with_writer(std::io::stderr)
      .init();

   println!("Looking for client config in {}", install_dir()?.display());

   let registered = PipelineBuilder::<String, String, InitError<std::io::Error>>::new()
      .use_init_guard(Arc::new(ClusterClient::default()), ConfigSource::Default);

   let pipeline = match registered {
      Ok(builder) => builder.build(|path: String| async move { Ok(path) }),
      Err(err @ ConfigError::NotFound { .. }) => {
         // Fatal at startup: nothing has been served yet.
         eprintln!("Refusing to start: {err}");
         return Err(err);
      }
      Err(err) => return Err(err),
   };

   match pipeline.dispatch("/status".to_string()).await {
      Ok(path) => println!("Served {path}"),
      Err(err) => eprintln!("Request failed: {err}"),
   }
   Ok(())
}
