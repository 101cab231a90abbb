use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color};
use clap::builder::styling::{Style, Styles};
use clap::{ColorChoice, Parser, Subcommand};

use crate::config::{DEFAULT_MERGED_PREFIX, DEFAULT_SNAPSHOT, OutputFormat};

pub const BANNER: &str = "\x1b[0;91m███    ███  █████  ██████  ██    ██ ██       █████\x1b[0m\n\
                      \x1b[0;93m████  ████ ██   ██ ██   ██ ██    ██ ██      ██   ██\x1b[0m\n\
                      \x1b[0;92m██ ████ ██ ███████ ██████  ██    ██ ██      ███████\x1b[0m\n\
                      \x1b[0;96m██  ██  ██ ██   ██ ██      ██    ██ ██      ██   ██\x1b[0m\n\
                      \x1b[0;95m██      ██ ██   ██ ██       ██████  ███████ ██   ██\x1b[0m\n\
                      Hierarchical alignment statistics by reference group, run and barcode";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mapula",
    version = env!("CARGO_PKG_VERSION"),
    about = BANNER,
    color = ColorChoice::Always,
    styles = get_styles(),
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Count alignment records into a statistics snapshot
    #[command(alias = "c")]
    Count {
        /// Alignment record tables (CSV or TSV, optionally gzipped)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Reference FASTA files; each file is one reference group
        #[arg(short, long, required = true, num_args = 1..)]
        refs: Vec<PathBuf>,

        /// CSV of expected counts by reference name
        #[arg(short, long)]
        exp: Option<PathBuf>,

        /// Snapshot path; an existing snapshot is extended
        #[arg(short, long, default_value = DEFAULT_SNAPSHOT)]
        json: PathBuf,

        /// Summary formats written next to the snapshot
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Stop on references missing from every reference file instead of counting them as Unmapped
        #[arg(long, default_value_t = false)]
        no_fallback: bool,
    },

    /// Combine snapshots from separate runs
    #[command(alias = "a")]
    Aggregate {
        /// Snapshot files to merge
        #[arg(short, long, required = true, num_args = 1..)]
        json: Vec<PathBuf>,

        /// Reference FASTA files; each file is one reference group
        #[arg(short, long, required = true, num_args = 1..)]
        refs: Vec<PathBuf>,

        /// CSV of expected counts by reference name
        #[arg(short, long)]
        exp: Option<PathBuf>,

        /// Output prefix, the merged snapshot is written to <prefix>.stats.mapula.json
        #[arg(short, long, default_value = DEFAULT_MERGED_PREFIX)]
        output: String,

        /// Summary formats written next to the snapshot
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}
