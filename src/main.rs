mod cli;

use timelapse::{config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn load_config(config_path: Option<&Path>, properties: &[String]) -> Result<config::Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config::apply_overrides(&mut config, properties)?;
    Ok(config)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
    properties: &[String],
) -> Result<()> {
    let mut config = load_config(config_path, properties)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Timelapse server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    for tool in timelapse_av::check_tools(&config.app.ffmpeg_path, &config.app.ffprobe_path) {
        if tool.available {
            tracing::info!(
                "{} available: {}",
                tool.name,
                tool.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!(
                "{} not found at '{}'; uploads or conversions will fail until it is installed",
                tool.name,
                tool.command
            );
        }
    }

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "timelapse=trace,timelapse_av=trace,ffmpeg_stderr=debug,tower_http=debug".to_string()
        } else {
            "timelapse=debug,timelapse_av=debug,ffmpeg_stderr=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(
                host,
                port,
                cli.config.as_deref(),
                &cli.properties,
            ))
        }
        Commands::Probe { file } => probe_file(&file, cli.config.as_deref(), &cli.properties),
        Commands::CheckTools => check_tools(cli.config.as_deref(), &cli.properties),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref(), &cli.properties)
        }
        Commands::Version => {
            println!("timelapse {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(file: &Path, config_path: Option<&Path>, properties: &[String]) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = load_config(config_path, properties)?;
    let rt = tokio::runtime::Runtime::new()?;
    let duration = rt.block_on(timelapse_av::probe_duration(
        &config.app.ffprobe_path,
        file,
    ))?;

    println!("File: {}", file.display());
    let secs = duration.floor() as u64;
    let mins = secs / 60;
    let hours = mins / 60;
    println!(
        "Duration: {:02}:{:02}:{:02} ({:.3}s)",
        hours,
        mins % 60,
        secs % 60,
        duration
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>, properties: &[String]) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path, properties)?;
    let tools = timelapse_av::check_tools(&config.app.ffmpeg_path, &config.app.ffprobe_path);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {} ({})", status, tool.name, tool.command);

        if let Some(ref version) = tool.version {
            print!(" - {}", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Uploads and conversions need both ffmpeg and ffprobe.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>, properties: &[String]) -> Result<()> {
    let mut config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };
    config::apply_overrides(&mut config, properties)?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Max upload: {} MiB", config.server.max_upload_mb);
    println!(
        "  Progress: every {} ms for up to {} s",
        config.server.progress_interval_ms, config.server.progress_timeout_secs
    );
    println!("  Output path: {}", config.app.output_path);
    println!("  ffmpeg: {}", config.app.ffmpeg_path);
    println!("  ffprobe: {}", config.app.ffprobe_path);
    println!("  Staging dir: {}", config.app.staging_dir().display());

    Ok(())
}
