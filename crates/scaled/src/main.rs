// # scaled - Scale Telemetry Daemon
//
// The scaled daemon is a THIN integration layer:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering ingest transports
// 4. Starting the ingestion engine and the query API
//
// All ingestion logic lives in scale-core; do not add parsing, policy,
// or store logic here.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Ingestion
// - `SCALED_TRANSPORT`: Transport variant (udp, tcp; default udp)
// - `SCALED_INGEST_PORT`: Port to listen on (default 3666)
// - `SCALED_ALLOWED_IP`: The single authorized sender address
//   (default 192.168.0.199)
// - `SCALED_ALLOWED_PORT`: The sender's fixed source port, checked for
//   udp only (default 5001)
//
// ### Query API
// - `SCALED_API_PORT`: HTTP port for the query service (default 7001)
// - `SCALED_CORS_ORIGIN`: Allowed CORS origin, or `any`
//   (default http://localhost:3000)
//
// ### Audit
// - `SCALED_AUDIT_PATH`: JSONL audit log path, or `none` to disable
//   (default data/scale_data.json; udp only)
//
// ### Misc
// - `SCALED_ERROR_BACKOFF_SECS`: Pause after a failed iteration (default 1)
// - `SCALED_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export SCALED_TRANSPORT=udp
// export SCALED_ALLOWED_IP=192.168.0.199
// export SCALED_ALLOWED_PORT=5001
//
// scaled
// ```

use anyhow::Result;
use std::env;
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use scale_core::config::{ApiConfig, AuditConfig, EngineConfig, IngestConfig, ScaleConfig};
use scale_core::{FileAuditSink, IngestEngine, LatestValueStore, TransportRegistry};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ScaledExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ScaledExitCode> for ExitCode {
    fn from(code: ScaledExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    transport: String,
    ingest_port: u16,
    allowed_ip: String,
    allowed_port: u16,
    api_port: u16,
    cors_origin: String,
    audit_path: String,
    error_backoff_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            transport: env::var("SCALED_TRANSPORT").unwrap_or_else(|_| "udp".to_string()),
            ingest_port: parse_env("SCALED_INGEST_PORT", 3666)?,
            allowed_ip: env::var("SCALED_ALLOWED_IP")
                .unwrap_or_else(|_| "192.168.0.199".to_string()),
            allowed_port: parse_env("SCALED_ALLOWED_PORT", 5001)?,
            api_port: parse_env("SCALED_API_PORT", 7001)?,
            cors_origin: env::var("SCALED_CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            audit_path: env::var("SCALED_AUDIT_PATH")
                .unwrap_or_else(|_| scale_core::config::DEFAULT_AUDIT_PATH.to_string()),
            error_backoff_secs: parse_env("SCALED_ERROR_BACKOFF_SECS", 1)?,
            log_level: env::var("SCALED_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        // Validate transport type
        match self.transport.as_str() {
            "udp" | "tcp" => {}
            _ => anyhow::bail!(
                "SCALED_TRANSPORT '{}' is not supported. \
                Supported transports: udp, tcp",
                self.transport
            ),
        }

        // Validate the allowed sender address
        if self.allowed_ip.parse::<IpAddr>().is_err() {
            anyhow::bail!(
                "SCALED_ALLOWED_IP '{}' is not a valid IP address. \
                Set it via: export SCALED_ALLOWED_IP=192.168.0.199",
                self.allowed_ip
            );
        }

        // Validate ports
        if self.ingest_port == 0 {
            anyhow::bail!("SCALED_INGEST_PORT cannot be 0");
        }
        if self.api_port == 0 {
            anyhow::bail!("SCALED_API_PORT cannot be 0");
        }
        if self.transport == "udp" && self.allowed_port == 0 {
            anyhow::bail!(
                "SCALED_ALLOWED_PORT cannot be 0 for the udp transport. \
                Set it via: export SCALED_ALLOWED_PORT=5001"
            );
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SCALED_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the core configuration
    fn to_scale_config(&self) -> Result<ScaleConfig> {
        let allowed_ip: IpAddr = self.allowed_ip.parse()?;

        let ingest = match self.transport.as_str() {
            "udp" => IngestConfig::Udp {
                port: self.ingest_port,
                allowed_ip,
                allowed_port: self.allowed_port,
            },
            "tcp" => IngestConfig::Tcp {
                port: self.ingest_port,
                allowed_ip,
            },
            other => anyhow::bail!("unsupported transport: {}", other),
        };

        // The audit trail is a datagram-variant concern; the stream
        // variant never appends
        let audit = if self.transport != "udp" || self.audit_path.eq_ignore_ascii_case("none") {
            AuditConfig::Disabled
        } else {
            AuditConfig::FileAt {
                path: self.audit_path.clone(),
            }
        };

        let cors_origin = if self.cors_origin.eq_ignore_ascii_case("any") {
            None
        } else {
            Some(self.cors_origin.clone())
        };

        let config = ScaleConfig {
            ingest,
            api: ApiConfig {
                port: self.api_port,
                cors_origin,
            },
            audit,
            engine: EngineConfig {
                error_backoff_secs: self.error_backoff_secs,
                ..EngineConfig::default()
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Parse an env var, falling back to `default` when unset
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("{} '{}' is invalid: {}", name, value, e)),
        Err(_) => Ok(default),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ScaledExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ScaledExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ScaledExitCode::ConfigError.into();
    }

    info!("Starting scaled daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ScaledExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            ScaledExitCode::RuntimeError
        } else {
            ScaledExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Create the transport registry and register built-in transports
    let registry = TransportRegistry::new();

    #[cfg(feature = "udp")]
    {
        info!("Registering UDP transport");
        scale_ingest_udp::register(&registry);
    }

    #[cfg(feature = "tcp")]
    {
        info!("Registering TCP transport");
        scale_ingest_tcp::register(&registry);
    }

    let scale_config = config.to_scale_config()?;

    info!("Transport: {}", scale_config.ingest.type_name());
    info!("Ingest port: {}", scale_config.ingest.port());
    info!(
        "Only accepting data from: {}{}",
        config.allowed_ip,
        if scale_config.ingest.type_name() == "udp" {
            format!(":{}", config.allowed_port)
        } else {
            String::new()
        }
    );

    // Shared state: one store for the ingestion and query paths
    let store = LatestValueStore::new();

    // Audit sink, shared between the engine and the legacy endpoint
    let audit = match scale_config.audit.path() {
        Some(path) => {
            info!("Audit trail: {}", path);
            Some(Arc::new(FileAuditSink::new(path).await?))
        }
        None => None,
    };

    // Start the query API in the background
    let api_ctx = scale_api::ApiContext {
        store: store.clone(),
        audit: audit.clone(),
    };
    let api_router = scale_api::router(api_ctx, scale_config.api.cors_origin.as_deref())?;
    let api_port = scale_config.api.port;
    tokio::spawn(async move {
        if let Err(e) = scale_api::serve(api_router, api_port).await {
            error!("Query API error: {}", e);
        }
    });

    // Create and run the ingestion engine
    let transport = registry.create_transport(&scale_config.ingest)?;
    let engine_audit = audit.map(|sink| Box::new(sink) as Box<dyn scale_core::AuditSink>);

    let (engine, _event_rx) =
        IngestEngine::new(transport, store, engine_audit, scale_config.engine)?;

    info!("Starting ingestion engine");
    engine.run().await?;

    info!("Shutting down daemon");
    Ok(())
}
