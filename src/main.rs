use anyhow::Context;
use clap::{Parser, Subcommand};
use sheetbind::cli;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetbind")]
#[command(about = "Fill spreadsheet templates with records, and read them back.")]
#[command(long_about = "sheetbind - typed records <-> spreadsheet rows

Fields are placed by explicit column index, by a field -> title map, or by
matching their titles against the template's header row. Styles and column
widths of .xlsx templates are kept; written cells take the style of the row
below the header.

COMMANDS:
  export   - Fill an xls/xlsx template with JSON records (writes .xlsx)
  import   - Read sheet rows back into JSON records
  headers  - List the header titles of a sheet row

EXAMPLES:
  sheetbind export template.xlsx -m mapping.yaml -d people.json -o out.xlsx
  sheetbind import out.xlsx -m mapping.yaml
  sheetbind headers template.xlsx --row 0

Set RUST_LOG=sheetbind=debug for resolution details.")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Fill an xls/xlsx template with JSON records.

The mapping file (YAML) names the sheet, the first data row and the columns.
The header row is the row right above start_row. The data file holds a JSON
array of objects keyed by field name.

The result is always written as .xlsx.")]
    /// Fill a template with JSON records
    Export {
        /// Template workbook (.xls or .xlsx)
        template: PathBuf,

        /// Mapping file (YAML)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Record data (JSON array of objects)
        #[arg(short, long)]
        data: PathBuf,

        /// Output workbook (.xlsx)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read sheet rows back into JSON records
    Import {
        /// Source workbook (.xls or .xlsx)
        input: PathBuf,

        /// Mapping file (YAML)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the header titles of a sheet row
    Headers {
        /// Workbook (.xls or .xlsx)
        input: PathBuf,

        /// 0-based sheet index
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// 0-based header row
        #[arg(short, long, default_value = "0")]
        row: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sheetbind=debug"
    } else {
        "sheetbind=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Export {
            template,
            mapping,
            data,
            output,
        } => {
            let target = output.display().to_string();
            cli::export(template, mapping, data, output, cli.verbose)
                .with_context(|| format!("export to {} failed", target))?
        }

        Commands::Import {
            input,
            mapping,
            output,
        } => {
            let source = input.display().to_string();
            cli::import(input, mapping, output, cli.verbose)
                .with_context(|| format!("import from {} failed", source))?
        }

        Commands::Headers { input, sheet, row } => {
            let source = input.display().to_string();
            cli::headers(input, sheet, row)
                .with_context(|| format!("reading headers of {} failed", source))?
        }
    }

    Ok(())
}
