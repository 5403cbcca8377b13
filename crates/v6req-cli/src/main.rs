use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use v6req_client::LookupClient;
use v6req_core::message::request_message;
use v6req_core::{Asn, AsnDetails, LookupConfig, ServerConfig};
use v6req_web::Orchestrator;

mod daemon;

/// Does your provider support IPv6? Look up an ASN's IPv6 prefixes and
/// draft a request for IPv6 service.
#[derive(Parser)]
#[command(name = "v6req")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web front end
    Serve(ServeArgs),
    /// Look up IPv6 prefixes and organization details for an ASN
    Lookup(LookupArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Run as a background process on IPv6 localhost
    #[arg(short = 'd', long)]
    daemon: bool,

    #[arg(long = "daemon-child", hide = true)]
    daemon_child: bool,
}

#[derive(Parser)]
struct LookupArgs {
    /// ASN number (e.g., 19625 or AS19625)
    #[arg(value_name = "ASN")]
    asn: String,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output (pretty-printed)
    Json,
    /// JSON output (compact)
    JsonCompact,
    /// CSV output, one row per prefix
    Csv,
}

#[derive(Serialize)]
struct LookupResult {
    asn: Asn,
    details: Option<AsnDetails>,
    prefixes: Vec<String>,
    message: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve(args) => handle_serve(args),
        Commands::Lookup(args) => handle_lookup(args, cli.output),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

fn build_client() -> Result<Arc<LookupClient>> {
    let config = LookupConfig::from_env()?;
    Ok(Arc::new(LookupClient::new(config)?))
}

fn handle_serve(args: ServeArgs) -> Result<()> {
    if args.daemon && !args.daemon_child {
        let pid = daemon::spawn_detached()?;
        println!(
            "{} Started daemon process with PID: {} (IPv6 localhost only, port {})",
            "›".blue(),
            pid,
            args.port
        );
        return Ok(());
    }

    let server = ServerConfig {
        port: args.port,
        loopback_only: args.daemon_child,
        ..ServerConfig::default()
    };
    let ip = if server.loopback_only {
        Ipv6Addr::LOCALHOST
    } else {
        Ipv6Addr::UNSPECIFIED
    };
    let addr = SocketAddr::from((ip, server.port));

    let orchestrator = Arc::new(Orchestrator::new(build_client()?));
    runtime()?.block_on(v6req_web::transport::serve(
        orchestrator,
        addr,
        server.shutdown_grace,
        shutdown_signal(),
    ))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Received interrupt signal");
}

fn handle_lookup(args: LookupArgs, format: OutputFormat) -> Result<()> {
    let asn: Asn = args.asn.parse()?;
    let client = build_client()?;

    let (details, prefixes) = runtime()?.block_on(async {
        tokio::join!(client.asn_details(asn), client.ipv6_prefixes(asn))
    });

    let details = match details {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::debug!(error = %e, "ASN details unavailable");
            None
        }
    };
    let prefixes = prefixes?;

    let result = LookupResult {
        asn,
        message: request_message(&prefixes),
        details,
        prefixes,
    };

    print_result(&result, format)
}

fn print_result(result: &LookupResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print_human(result),
        OutputFormat::Json => print_json(result, true)?,
        OutputFormat::JsonCompact => print_json(result, false)?,
        OutputFormat::Csv => print_csv(result)?,
    }
    Ok(())
}

fn print_human(result: &LookupResult) {
    println!();
    println!("{}", format!("Results for {}", result.asn).bold().cyan());
    println!("{}", "─".repeat(50).dimmed());

    if let Some(details) = &result.details {
        println!("{:>15}: {}", "Organization".bold(), details.name);
        if let Some(desc) = &details.short_description {
            println!("{:>15}: {}", "Description".bold(), desc);
        }
        if let Some(country) = &details.country_code {
            println!("{:>15}: {}", "Country".bold(), country);
        }
        if let Some(rir) = &details.rir_allocation {
            println!("{:>15}: {}", "RIR".bold(), rir);
        }
        if let Some(website) = &details.website {
            println!("{:>15}: {}", "Website".bold(), website);
        }
        if !details.email_contacts.is_empty() {
            println!("{:>15}: {}", "Contacts".bold(), details.email_contacts.join(", "));
        }
    }

    if result.prefixes.is_empty() {
        println!(
            "{:>15}: {}",
            "IPv6".bold(),
            "no IPv6 prefixes registered".yellow()
        );
    } else {
        for (i, prefix) in result.prefixes.iter().enumerate() {
            let label = if i == 0 { "IPv6" } else { "" };
            println!("{:>15}: {}", label.bold(), prefix.green());
        }
    }

    println!();
    println!("{}", "Request message".bold().cyan());
    println!("{}", "─".repeat(50).dimmed());
    println!("{}", result.message);
    println!();
}

fn print_json(result: &LookupResult, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", serde_json::to_string(result)?);
    }
    Ok(())
}

fn print_csv(result: &LookupResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(["asn", "organization", "prefix"])?;
    let asn = result.asn.number().to_string();
    let organization = result.details.as_ref().map_or("", |d| d.name.as_str());
    for prefix in &result.prefixes {
        wtr.write_record([asn.as_str(), organization, prefix.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
