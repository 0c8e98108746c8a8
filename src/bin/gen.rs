//! apicat-gen: CLI tool for building and inspecting API catalog files.

use apicat::catalog::ApiCatalog;
use apicat::{ApiAvailability, AvailabilityContext, CatalogWriter, Manifest, TableKind, WriterConfig};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apicat-gen")]
#[command(version = "0.1.0")]
#[command(about = "Build and inspect binary API catalogs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a catalog from a YAML or JSON manifest
    Build {
        /// Input manifest file
        #[arg(short, long)]
        input: PathBuf,

        /// Output catalog file
        #[arg(short, long)]
        output: PathBuf,

        /// Writer configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print row counts and table sizes
    Stats {
        /// Catalog file
        #[arg(short, long)]
        catalog: PathBuf,
    },

    /// Show one API with its declarations and availability
    Show {
        /// Catalog file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Dotted full name, e.g. System.Console.Beep
        #[arg(short, long)]
        api: String,
    },

    /// Dump the raw rows of one table
    Dump {
        /// Catalog file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Table name, e.g. assembly or platformSupport
        #[arg(short, long)]
        table: String,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            config,
        } => build(&input, &output, config.as_ref()),
        Commands::Stats { catalog } => stats(&catalog),
        Commands::Show { catalog, api } => show(&catalog, &api),
        Commands::Dump {
            catalog,
            table,
            limit,
        } => dump(&catalog, &table, limit),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build(
    input: &PathBuf,
    output: &PathBuf,
    config: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => WriterConfig::load(path)?,
        None => WriterConfig::default(),
    };

    let manifest = Manifest::load(input)?;
    let builder = manifest.to_builder()?;

    let data = CatalogWriter::with_config(config).write_to_vec(&builder)?;
    fs::write(output, &data)?;

    println!("Successfully built {:?} -> {:?} ({} bytes)", input, output, data.len());
    Ok(())
}

fn stats(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ApiCatalog::open(path)?;
    print!("{}", catalog.statistics());
    Ok(())
}

fn show(path: &PathBuf, full_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ApiCatalog::open(path)?;
    let api = catalog
        .find_api(full_name)
        .ok_or_else(|| format!("API not found: {}", full_name))?;

    println!("{} {:?}", api.full_name(), api.kind());
    println!("  guid: {}", api.guid());

    for declaration in api.declarations() {
        let assembly = declaration.assembly();
        println!("\n  [{} {}]", assembly.name(), assembly.version());
        for line in declaration.full_markup().to_string().lines() {
            println!("    {}", line);
        }
        if let Some(obsoletion) = declaration.obsoletion() {
            println!("    obsolete: {}", obsoletion.message());
        }
        if let Some(preview) = declaration.preview_requirement() {
            println!("    preview: {}", preview.message());
        }
        if let Some(experimental) = declaration.experimental() {
            println!("    experimental: {}", experimental.diagnostic_id());
        }
    }

    let context = AvailabilityContext::new(&catalog);
    let availability = ApiAvailability::of(&context, api);
    if !availability.is_empty() {
        println!("\n  frameworks:");
        for entry in availability.entries() {
            let source = if entry.is_in_box() { "in-box" } else { "package" };
            println!("    {} ({})", entry.framework.name(), source);
        }
    }

    let usages: Vec<_> = api.usages().collect();
    if !usages.is_empty() {
        println!("\n  usage:");
        for usage in usages {
            println!("    {}: {:.1}%", usage.source.name(), usage.percentage * 100.0);
        }
    }

    Ok(())
}

fn dump(path: &PathBuf, table: &str, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let kind = TableKind::from_name(table).ok_or_else(|| format!("unknown table: {}", table))?;
    let catalog = ApiCatalog::open(path)?;

    let rows = catalog.row_offsets(kind);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{} ({} rows, {} bytes)", kind, rows.len(), catalog.table_len(kind))?;

    for row in rows.into_iter().take(limit.unwrap_or(usize::MAX)) {
        write!(out, "@{}", row)?;
        for (name, value) in catalog.decode_row(kind, row) {
            write!(out, " {}={}", name, value)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
