//! CLI argument definitions and subcommand routing.

pub mod access;
pub mod config;
pub mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve phone numbers, email addresses and IM handles to contacts.
#[derive(Parser)]
#[command(name = "imsg-contacts", version, about)]
pub struct Cli {
    /// Contacts directory file (JSON). Defaults to `$IMSG_CONTACTS_DIRECTORY`,
    /// then `directory.json` in the platform data directory if present.
    #[arg(short, long, global = true)]
    pub directory: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `imsg_ffi=trace`.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// One-shot operations.
#[derive(Subcommand)]
pub enum Command {
    /// Show the contacts authorization status.
    Status,
    /// Ask for contacts access if it has not been decided.
    Request,
    /// Resolve handles and print one row per handle.
    Resolve(ResolveArgs),
    /// Print a display label for each value (chat identifiers accepted).
    Label {
        /// Handles or chat identifiers such as `iMessage;-;+15551234567`.
        #[arg(required = true)]
        values: Vec<String>,
    },
}

/// Arguments for the `resolve` subcommand.
#[derive(clap::Args)]
pub struct ResolveArgs {
    /// Handles to resolve.
    #[arg(required = true)]
    pub handles: Vec<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Reserved resolver flags, passed through unchanged.
    #[arg(long, default_value_t = 0)]
    pub flags: u32,

    /// Ask for access first if it has not been decided.
    #[arg(long)]
    pub request: bool,
}
