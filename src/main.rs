mod cli;

use tstot::config::{self, ConfigOverrides};
use tstot::{ProbeSummary, Report};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tstot=debug,tstot_probe=debug,tstot_script=debug".to_string()
        } else {
            "tstot=info,tstot_probe=info,tstot_script=warn".to_string()
        }
    });

    // stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve {
            input,
            script,
            output,
            json,
            search,
        } => resolve_file(
            &input,
            script.as_deref(),
            output.as_deref(),
            json,
            &ConfigOverrides::from(&search),
            cli.config.as_deref(),
        ),
        Commands::Probe {
            file,
            json,
            video_pid,
        } => {
            let overrides = ConfigOverrides {
                video_pid,
                ..Default::default()
            };
            probe_file(&file, json, &overrides, cli.config.as_deref())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tstot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<config::Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config.apply(overrides);
    config::validate_config(&config)?;
    Ok(config)
}

fn resolve_file(
    input: &Path,
    script: Option<&Path>,
    output: Option<&Path>,
    json: bool,
    overrides: &ConfigOverrides,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    if let Some(script) = script {
        if !script.exists() {
            anyhow::bail!("Script file does not exist: {:?}", script);
        }
    }

    tracing::info!("Analyzing {:?}", input);
    let report: Report = tstot::analyze(input, script, &config)
        .with_context(|| format!("Failed to resolve {:?}", input))?;

    let json_str = if json || output.is_some() {
        Some(report.to_json()?)
    } else {
        None
    };

    if let (Some(path), Some(json_str)) = (output, json_str.as_ref()) {
        std::fs::write(path, json_str)
            .with_context(|| format!("Failed to write JSON report: {:?}", path))?;
        tracing::info!("JSON output written to {:?}", path);
    }

    match json_str {
        Some(json_str) if json => println!("{}", json_str),
        _ => print!("{}", report.render_text(&config.report.time_label)),
    }

    Ok(())
}

fn probe_file(
    file: &Path,
    json: bool,
    overrides: &ConfigOverrides,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let index =
        tstot::probe(file, &config).with_context(|| format!("Failed to probe {:?}", file))?;
    let summary = ProbeSummary::new(file, &index);

    if json {
        let json_str = serde_json::to_string_pretty(&summary)?;
        println!("{}", json_str);
    } else {
        print!("{}", summary.render_text());
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            let config = config::load_config(p)?;
            println!("Validated config: {:?}", p);
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Search window: {} packets", config.search.window_packets);
    println!("  Verify CRC: {}", config.search.verify_crc);
    match config.video.pid {
        Some(pid) => println!("  Video PID: 0x{:04x}", pid),
        None => println!("  Video PID: auto"),
    }
    println!("  Time label: {}", config.report.time_label);
    println!("  Interpolate: {}", config.report.interpolate);

    Ok(())
}
