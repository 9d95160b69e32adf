//! geocrypt: location- and device-bound file encryption
//!
//! Commands:
//!   fingerprint            - show the geohash cell and device hash for a position
//!   seal <input>           - encrypt a file bound to the current cell and device
//!   verify <id>            - check whether an identifier may be opened here
//!   open <envelope>        - verify, then decrypt a sealed file
//!   config show            - display current configuration

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use geocrypt_core::GeocryptConfig;
use geocrypt_crypto::{
    device_fingerprint, fingerprint, verify_access, AccessDecision, Coordinates, FileIdentifier,
    GeoLock,
};

/// Suffix appended to an envelope path for its identifier sidecar
const ID_SUFFIX: &str = "id";

/// Suffix appended to sealed files
const SEALED_SUFFIX: &str = "geo";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "geocrypt",
    version,
    about = "Location- and device-bound file encryption",
    long_about = "geocrypt: seal files so they only open inside one geohash cell, on one device, before expiry"
)]
struct Cli {
    /// Path to geocrypt.toml configuration file
    #[arg(long, short = 'c', env = "GEOCRYPT_CONFIG", default_value = "geocrypt.toml")]
    config: PathBuf,

    /// Log level (overrides config; RUST_LOG overrides both)
    #[arg(long, env = "GEOCRYPT_LOG")]
    log: Option<String>,

    /// Log format (overrides config)
    #[arg(long, env = "GEOCRYPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

/// Where the caller is and what it runs on
#[derive(Args, Debug, Clone)]
struct Position {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Raw device name (default: config device.name, then host name)
    #[arg(long, env = "GEOCRYPT_DEVICE")]
    device: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the areal and device fingerprints for a position
    Fingerprint {
        #[command(flatten)]
        at: Position,
    },

    /// Encrypt a file bound to a location and device
    ///
    /// Writes the envelope to <output> and the identifier to <output>.id,
    /// then prints the identifier.
    Seal {
        /// File to seal
        input: PathBuf,
        #[command(flatten)]
        at: Position,
        /// File type recorded in the identifier (default: input extension)
        #[arg(long = "type")]
        file_type: Option<String>,
        /// Envelope path (default: <input>.geo)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check whether an identifier may be opened at a position
    Verify {
        /// File identifier
        id: String,
        #[command(flatten)]
        at: Position,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify access, then decrypt a sealed file
    Open {
        /// Envelope file written by `seal`
        envelope: PathBuf,
        /// File identifier (default: contents of <envelope>.id)
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        at: Position,
        /// Plaintext path (default: envelope path without .geo)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config).await?;
    let config = loaded.clone().unwrap_or_default();

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = match cli.log_format {
        Some(format) => format,
        None if config.log.format == "json" => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(level, &format);

    if loaded.is_none() {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    let lock = GeoLock::from_config(&config).context("invalid configuration")?;

    match cli.command {
        Commands::Fingerprint { at } => cmd_fingerprint(&lock, &config, &at),
        Commands::Seal {
            input,
            at,
            file_type,
            output,
        } => {
            cmd_seal(
                &lock,
                &config,
                &input,
                &at,
                file_type.as_deref(),
                output.as_deref(),
            )
            .await
        }
        Commands::Verify { id, at, json } => cmd_verify(&config, &id, &at, json),
        Commands::Open {
            envelope,
            id,
            at,
            output,
        } => cmd_open(&lock, &config, &envelope, id.as_deref(), &at, output.as_deref()).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ── Config / logging helpers ──────────────────────────────────────────────────

/// `Ok(None)` when the file does not exist
async fn load_config(path: &Path) -> Result<Option<GeocryptConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config: {}", path.display()))?;
    GeocryptConfig::from_toml(&content)
        .map(Some)
        .with_context(|| format!("parsing config: {}", path.display()))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout stays clean for identifiers and JSON
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Device name from the flag, then config, then the host name
fn resolve_device(flag: Option<&str>, config: &GeocryptConfig) -> Result<String> {
    if let Some(name) = flag.or(config.device.name.as_deref()) {
        return Ok(name.to_string());
    }
    let host = hostname::get().context("no --device given and host name unavailable")?;
    Ok(host.to_string_lossy().into_owned())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

fn default_open_path(envelope: &Path) -> PathBuf {
    match envelope.extension() {
        Some(ext) if ext == SEALED_SUFFIX => envelope.with_extension(""),
        _ => with_suffix(envelope, "out"),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_fingerprint(lock: &GeoLock, config: &GeocryptConfig, at: &Position) -> Result<()> {
    let device = resolve_device(at.device.as_deref(), config)?;
    let areal = fingerprint(at.lat, at.lon, lock.policy().geohash_precision)
        .context("computing areal fingerprint")?;
    let bounds = areal.bounds();
    let center = areal.center();

    println!("geohash:     {areal}");
    println!("precision:   {}", areal.precision());
    println!(
        "cell:        lat [{:.6}, {:.6}]  lon [{:.6}, {:.6}]",
        bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
    );
    println!("center:      {:.6}, {:.6}", center.latitude, center.longitude);
    println!("device:      {device}");
    println!("device hash: {}", device_fingerprint(&device));
    Ok(())
}

async fn cmd_seal(
    lock: &GeoLock,
    config: &GeocryptConfig,
    input: &Path,
    at: &Position,
    file_type: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let device = resolve_device(at.device.as_deref(), config)?;
    let file_type = match file_type {
        Some(t) => t.to_string(),
        None => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".into()),
    };

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading: {}", input.display()))?;
    let content = STANDARD.encode(&bytes);

    let sealed = lock
        .seal(&content, Coordinates::new(at.lat, at.lon), &device, &file_type)
        .with_context(|| format!("sealing: {}", input.display()))?;

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, SEALED_SUFFIX));
    let id_path = with_suffix(&out, ID_SUFFIX);
    tokio::fs::write(&out, sealed.envelope.as_str())
        .await
        .with_context(|| format!("writing envelope: {}", out.display()))?;
    tokio::fs::write(&id_path, sealed.id.to_string())
        .await
        .with_context(|| format!("writing identifier: {}", id_path.display()))?;

    tracing::info!(
        input = %input.display(),
        envelope = %out.display(),
        bytes = bytes.len(),
        "sealed"
    );
    println!("{}", sealed.id);
    Ok(())
}

fn cmd_verify(config: &GeocryptConfig, id: &str, at: &Position, json: bool) -> Result<()> {
    let device = resolve_device(at.device.as_deref(), config)?;
    let id: FileIdentifier = id.trim().parse().context("parsing identifier")?;
    let decision = verify_access(&id, at.lat, at.lon, &device)?;

    if json {
        println!("{}", serde_json::to_string(&decision)?);
    } else {
        match decision {
            AccessDecision::Allow => println!("allow"),
            AccessDecision::Deny(reason) => println!("deny: {reason}"),
        }
    }

    if !decision.is_allowed() {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_open(
    lock: &GeoLock,
    config: &GeocryptConfig,
    envelope_path: &Path,
    id: Option<&str>,
    at: &Position,
    output: Option<&Path>,
) -> Result<()> {
    let device = resolve_device(at.device.as_deref(), config)?;

    let id_text = match id {
        Some(id) => id.to_string(),
        None => {
            let id_path = with_suffix(envelope_path, ID_SUFFIX);
            tokio::fs::read_to_string(&id_path)
                .await
                .with_context(|| format!("no --id given; reading {}", id_path.display()))?
        }
    };
    let id: FileIdentifier = id_text.trim().parse().context("parsing identifier")?;

    let envelope = tokio::fs::read_to_string(envelope_path)
        .await
        .with_context(|| format!("reading envelope: {}", envelope_path.display()))?;

    let content = lock
        .open(&id, &envelope, Coordinates::new(at.lat, at.lon), &device)
        .with_context(|| format!("opening: {}", envelope_path.display()))?;
    let bytes = STANDARD
        .decode(content.as_bytes())
        .context("decrypted content is not base64")?;

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_open_path(envelope_path));
    tokio::fs::write(&out, &bytes)
        .await
        .with_context(|| format!("writing: {}", out.display()))?;

    println!("opened {} ({} bytes) -> {}", id.file_type(), bytes.len(), out.display());
    Ok(())
}

fn cmd_config_show(config: &GeocryptConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("serializing config")?;
    print!("{rendered}");
    Ok(())
}
