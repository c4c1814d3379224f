//! `spider-cache` command-line tool.
//!
//! Thin wrapper around the spider-cache-inspect library: parses arguments,
//! sets up logging, builds an [`Inspector`] from the configuration and prints
//! command results as tables or JSON.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use spider_cache_inspect::output::{
    OutputFormat, OutputStyle, Tone, count_badge, keymap_table, paint, servers_table,
};
use spider_cache_inspect::{Identity, InspectConfig, Inspector, Keymap, StaticRegistry};
use spider_cache_protocol::{MemcachedClient, ServerEndpoint};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "spider-cache",
    about = "Discover, browse and flush the keys of memcached object caches",
    version,
    long_about = "Walks memcached slab classes to recover every stored key, groups them by site and cache group, and deletes groups, keys or per-user entries."
)]
struct Cli {
    /// Set the logging level (overrides RUST_LOG)
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Draw tables with ASCII characters only
    #[arg(long, global = true)]
    ascii: bool,

    #[command(flatten)]
    config: InspectConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured cache servers
    Servers,

    /// Show the keymap of one or all servers
    Keys {
        /// Only inspect this server
        #[arg(long)]
        server: Option<ServerEndpoint>,
    },

    /// Delete every key of a group on every server
    FlushGroup {
        /// Cache group
        group: String,
    },

    /// Delete specific keys of a group
    FlushKeys {
        /// Cache group
        group: String,
        /// Keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete one key
    Remove {
        /// Cache group
        group: String,
        /// Key within the group
        key: String,
    },

    /// Show one stored item
    Get {
        /// Cache group
        group: String,
        /// Key within the group
        key: String,
    },

    /// Drop every cached copy of a user
    ClearUser {
        /// Numeric user id
        #[arg(long)]
        id: u64,
        /// Login name
        #[arg(long)]
        login: String,
        /// Normalized name
        #[arg(long)]
        slug: String,
        /// Email address
        #[arg(long)]
        email: String,
    },
}

type CliInspector = Inspector<MemcachedClient, StaticRegistry>;

#[derive(Serialize)]
struct ServerKeymap<'a> {
    server: &'a ServerEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<&'a Keymap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Deleted<'a> {
    group: &'a str,
    deleted: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli.config.validate()?;

    let style = OutputStyle::new(cli.no_color, cli.ascii);
    let inspector = Inspector::new(
        cli.config.client(),
        cli.config.registry(),
        cli.config.decode_options(),
    );

    match cli.command {
        Commands::Servers => show_servers(&inspector, cli.format, &style)?,
        Commands::Keys { server } => {
            if let Some(server) = &server {
                cli.config.require_server(server)?;
            }
            show_keys(&inspector, server, cli.format, &style).await?;
        }
        Commands::FlushGroup { group } => {
            let deleted = inspector.flush_group(&group).await;
            report_deleted(&group, deleted, cli.format, &style)?;
        }
        Commands::FlushKeys { group, keys } => {
            let deleted = inspector.flush_group_keys(&group, &keys).await;
            report_deleted(&group, deleted, cli.format, &style)?;
        }
        Commands::Remove { group, key } => {
            let removed = inspector.remove_key(&group, &key).await;
            if let Some(json) = cli.format.to_json(&serde_json::json!({ "removed": removed }))? {
                println!("{json}");
            } else if removed {
                println!("{}", paint("Key removed", Tone::Success, &style));
            } else {
                println!("{}", paint("Key not removed", Tone::Warning, &style));
            }
        }
        Commands::Get { group, key } => {
            let report = inspector.inspect_item(&group, &key).await;
            match cli.format.to_json(&report)? {
                Some(json) => println!("{json}"),
                None => println!("{report}"),
            }
        }
        Commands::ClearUser {
            id,
            login,
            slug,
            email,
        } => {
            let identity = Identity {
                id,
                login,
                slug,
                email,
            };
            let cleared = inspector.clear_identity_caches(&identity).await;
            if let Some(json) =
                cli.format.to_json(&serde_json::json!({ "user": identity, "cleared": cleared }))?
            {
                println!("{json}");
            } else {
                println!(
                    "{} {}",
                    paint(&format!("Cleared caches for user {id}"), Tone::Success, &style),
                    count_badge(cleared, "key", &style)
                );
            }
        }
    }

    Ok(())
}

fn show_servers(inspector: &CliInspector, format: OutputFormat, style: &OutputStyle) -> Result<()> {
    let servers = inspector.servers();

    if let Some(json) = format.to_json(&servers)? {
        println!("{json}");
    } else if servers.is_empty() {
        println!("{}", paint("No cache servers configured", Tone::Warning, style));
    } else {
        println!("{}", servers_table(&servers, style));
    }

    Ok(())
}

async fn show_keys(
    inspector: &CliInspector,
    server: Option<ServerEndpoint>,
    format: OutputFormat,
    style: &OutputStyle,
) -> Result<()> {
    let results = match server {
        Some(server) => {
            let keymap = inspector.keymap(&server).await;
            vec![(server, keymap)]
        }
        None => inspector.keymaps().await,
    };

    if format != OutputFormat::Text {
        let listing: Vec<ServerKeymap<'_>> = results
            .iter()
            .map(|(server, result)| ServerKeymap {
                server,
                groups: result.as_ref().ok(),
                error: result.as_ref().err().map(ToString::to_string),
            })
            .collect();
        if let Some(json) = format.to_json(&listing)? {
            println!("{json}");
        }
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", paint("No cache servers configured", Tone::Warning, style));
        return Ok(());
    }

    for (server, result) in &results {
        match result {
            Ok(keymap) => {
                println!(
                    "\n{} {}",
                    paint(&server.to_string(), Tone::Header, style),
                    count_badge(keymap.total_keys(), "key", style)
                );
                if keymap.is_empty() {
                    println!("{}", paint("No keys found", Tone::Warning, style));
                } else {
                    println!("{}", keymap_table(keymap, style));
                }
            }
            Err(e) => eprintln!("{}", paint(&e.to_string(), Tone::Error, style)),
        }
    }

    Ok(())
}

fn report_deleted(
    group: &str,
    deleted: usize,
    format: OutputFormat,
    style: &OutputStyle,
) -> Result<()> {
    if let Some(json) = format.to_json(&Deleted { group, deleted })? {
        println!("{json}");
    } else {
        println!(
            "{} {}",
            paint(&format!("Flushed group {group}"), Tone::Success, style),
            count_badge(deleted, "key", style)
        );
    }
    Ok(())
}
