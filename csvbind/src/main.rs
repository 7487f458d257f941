//! csvbind CLI - Map CSV files to and from the demo person records
//!
//! # Commands
//!
//! ```bash
//! csvbind read people.csv -o people.json      # CSV rows -> JSON records
//! csvbind write people.json people.csv        # JSON records -> CSV rows
//! csvbind columns --heading                   # Show the column bindings
//! ```
//!
//! Options default to `CSVBIND_*` environment variables (a `.env` file is
//! loaded first) unless `--config` points to a JSON options file.

mod demo;

use clap::{Parser, Subcommand};
use csvbind::{
    set_echo, CsvReader, CsvWriter, MapperOptions, MetadataRegistry, Record, RecordMetadata,
};
use demo::{NamedPerson, Person};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvbind")]
#[command(about = "Map CSV rows to and from typed person records", long_about = None)]
struct Cli {
    /// Echo session logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON options file (default: CSVBIND_* environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a CSV file and output the records as JSON
    Read {
        /// Input CSV file
        input: PathBuf,

        /// First line holds column names
        #[arg(long)]
        heading: bool,

        /// Cell delimiter pattern
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Input encoding label
        #[arg(short, long)]
        encoding: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write JSON records to a CSV file
    Write {
        /// Input JSON file (array of records)
        input: PathBuf,

        /// Output CSV file
        output: PathBuf,

        /// Emit a header line for new files
        #[arg(long)]
        heading: bool,

        /// Cell delimiter
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Truncate the output file instead of appending
        #[arg(long)]
        no_append: bool,
    },

    /// Show the column bindings of the demo record
    Columns {
        /// Show the header-addressed variant
        #[arg(long)]
        heading: bool,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    set_echo(cli.verbose);

    let result = load_options(cli.config.as_deref()).and_then(|options| match cli.command {
        Commands::Read {
            input,
            heading,
            delimiter,
            encoding,
            output,
        } => {
            let options = override_options(options, heading, delimiter, encoding);
            if options.has_heading {
                cmd_read::<NamedPerson>(&input, &options, output.as_deref())
            } else {
                cmd_read::<Person>(&input, &options, output.as_deref())
            }
        }

        Commands::Write {
            input,
            output,
            heading,
            delimiter,
            no_append,
        } => {
            let mut options = override_options(options, heading, delimiter, None);
            if no_append {
                options.append = false;
            }
            if options.has_heading {
                cmd_write::<NamedPerson>(&input, &output, &options)
            } else {
                cmd_write::<Person>(&input, &output, &options)
            }
        }

        Commands::Columns { heading } => {
            if heading || options.has_heading {
                cmd_columns::<NamedPerson>()
            } else {
                cmd_columns::<Person>()
            }
        }
    });

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(config: Option<&Path>) -> Result<MapperOptions, Box<dyn std::error::Error>> {
    let options = match config {
        Some(path) => MapperOptions::from_json(&fs::read_to_string(path)?)?,
        None => MapperOptions::from_env()?,
    };
    options.validate()?;
    Ok(options)
}

fn override_options(
    mut options: MapperOptions,
    heading: bool,
    delimiter: Option<String>,
    encoding: Option<String>,
) -> MapperOptions {
    if heading {
        options.has_heading = true;
    }
    if let Some(delimiter) = delimiter {
        options.delimiter = delimiter;
    }
    if let Some(encoding) = encoding {
        options.encoding = encoding;
    }
    options
}

fn cmd_read<R>(
    input: &Path,
    options: &MapperOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: Record + Serialize,
{
    eprintln!("📄 Reading CSV: {}", input.display());
    eprintln!("   Delimiter: '{}'", format_delimiter(&options.delimiter));
    eprintln!("   Encoding: {}", options.encoding);

    let reader = CsvReader::<R>::builder().file(input).options(options).build()?;
    if let Some(headers) = reader.headers() {
        eprintln!("   Columns: {}", headers.join(", "));
    }

    let mut records = reader.records();
    let mapped: Vec<R> = records.by_ref().collect();

    eprintln!("✅ Mapped {} records", mapped.len());
    if records.dropped() > 0 {
        eprintln!("   ⚠️  Dropped {} invalid rows", records.dropped());
    }

    let json = serde_json::to_string_pretty(&mapped)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_write<R>(
    input: &Path,
    output: &Path,
    options: &MapperOptions,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: Record + DeserializeOwned,
{
    eprintln!("📝 Writing CSV: {}", output.display());

    let content = fs::read_to_string(input)?;
    let records: Vec<R> = serde_json::from_str(&content)?;

    let mut writer = CsvWriter::<R>::builder().file(output).options(options).build()?;
    let written = writer.write_records(&records)?;
    writer.close()?;

    eprintln!("✅ Wrote {} records{}", written, if options.append { " (append)" } else { "" });
    Ok(())
}

fn cmd_columns<R: Record>() -> Result<(), Box<dyn std::error::Error>> {
    let metadata: std::sync::Arc<RecordMetadata<R>> = MetadataRegistry::global().metadata::<R>()?;

    let columns: Vec<_> = metadata
        .bindings()
        .iter()
        .map(|binding| {
            json!({
                "field": binding.name(),
                "type": binding.value_type(),
                "address": binding.address(),
                "format": binding.format(),
            })
        })
        .collect();

    let json = serde_json::to_string_pretty(&json!({
        "record": metadata.record_name(),
        "columns": columns,
    }))?;
    println!("{}", json);
    Ok(())
}

fn format_delimiter(d: &str) -> String {
    match d {
        "\t" => "\\t".to_string(),
        d => d.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
