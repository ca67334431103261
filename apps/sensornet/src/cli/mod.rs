//! # Sensornet CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show row counts per table
//! - `fields` - List the columns of a table
//! - `query` - Filter and project a table
//! - `union` - Filter and project a table joined with its ancestors
//! - `insert` - Insert a row
//! - `update` - Update fields of a row
//! - `delete` - Delete rows by id
//! - `init` - Create header-only table files

mod commands;

use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use sensornet_core::{SensorNetError, Table};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Sensornet - sensor network data engine
///
/// Stations, places, sensors and their records, stored as one delimited
/// file per table.
#[derive(Parser, Debug)]
#[command(name = "sensornet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the table files (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Field delimiter of the table files (overrides the config file)
    #[arg(long, global = true)]
    pub delimiter: Option<String>,

    /// Path to a TOML config file (default: sensornet.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Filter and projection flags shared by `query` and `union`.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Exact match, `field=value` (repeatable)
    #[arg(long = "eq", value_name = "FIELD=VALUE")]
    pub eq: Vec<String>,

    /// Inclusive range, `field=low..high`; either side may be empty (repeatable)
    #[arg(long = "range", value_name = "FIELD=LOW..HIGH")]
    pub range: Vec<String>,

    /// Set membership, `field=a,b,c` (repeatable)
    #[arg(long = "in", value_name = "FIELD=A,B,...")]
    pub any: Vec<String>,

    /// Columns to output, comma-separated, in order
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show row counts per table
    Status,

    /// List the columns of a table
    Fields {
        table: Table,

        /// List the columns of the union view instead
        #[arg(short, long)]
        union: bool,
    },

    /// Filter and project a table
    Query {
        table: Table,

        #[command(flatten)]
        args: QueryArgs,
    },

    /// Filter and project a table joined with all its ancestors
    Union {
        table: Table,

        #[command(flatten)]
        args: QueryArgs,
    },

    /// Insert a row; prints the assigned id
    Insert {
        table: Table,

        /// Field assignment, `field=value` (repeatable)
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Update fields of a row
    Update {
        table: Table,

        id: u64,

        /// Field assignment, `field=value` (repeatable)
        #[arg(short, long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete rows by id; nothing is deleted if any id is still referenced
    Delete {
        table: Table,

        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Create header-only table files
    Init {
        /// Overwrite existing table files
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration layers for `cli`.
pub fn resolve_config(cli: &Cli) -> Result<Config, SensorNetError> {
    let config = Config::load(cli.config.as_deref())?
        .with_overrides(cli.data_dir.clone(), cli.delimiter.clone());
    config.delimiter_byte()?;
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SensorNetError> {
    let mut config = resolve_config(&cli)?;
    let out = Output {
        json: cli.json_mode,
        quiet: cli.quiet,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config, out).await
        }
        Some(Commands::Status) | None => cmd_status(&config, out),
        Some(Commands::Fields { table, union }) => cmd_fields(&config, out, table, union),
        Some(Commands::Query { table, args }) => cmd_query(&config, out, table, &args, false),
        Some(Commands::Union { table, args }) => cmd_query(&config, out, table, &args, true),
        Some(Commands::Insert { table, set }) => cmd_insert(&config, out, table, &set),
        Some(Commands::Update { table, id, set }) => cmd_update(&config, out, table, id, &set),
        Some(Commands::Delete { table, ids }) => cmd_delete(&config, out, table, &ids),
        Some(Commands::Init { force }) => cmd_init(&config, out, force),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_query_flags() {
        let cli = Cli::try_parse_from([
            "sensornet",
            "query",
            "record",
            "--eq",
            "sensor_id=3",
            "--range",
            "measured_value=0..10",
            "--in",
            "id=1,2",
            "--fields",
            "id,measured_value",
        ])
        .expect("parse");

        let Some(Commands::Query { table, args }) = cli.command else {
            unreachable!("query command expected");
        };
        assert_eq!(table, Table::Record);
        assert_eq!(args.eq, vec!["sensor_id=3"]);
        assert_eq!(args.range, vec!["measured_value=0..10"]);
        assert_eq!(args.any, vec!["id=1,2"]);
        assert_eq!(
            args.fields,
            Some(vec!["id".to_string(), "measured_value".to_string()])
        );
    }

    #[test]
    fn unknown_table_is_rejected() {
        assert!(Cli::try_parse_from(["sensornet", "fields", "site"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sensornet",
            "delete",
            "place",
            "1",
            "2",
            "--json-mode",
            "-D",
            "net",
        ])
        .expect("parse");
        assert!(cli.json_mode);
        assert_eq!(cli.data_dir, Some(PathBuf::from("net")));
        assert!(matches!(cli.command, Some(Commands::Delete { ref ids, .. }) if ids == &[1, 2]));
    }
}
