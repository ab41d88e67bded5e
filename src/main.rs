use clap::{Parser, Subcommand};
use lsifpack::bundle::{query, GroupedBundleMaps};
use lsifpack::correlate::{correlate_with_capacity, fs_directory_children};
use lsifpack::logging;
use lsifpack::Settings;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lsifpack")]
#[command(version)]
#[command(about = "Compiles LSIF code-intelligence dumps into shard-ready storage bundles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an LSIF dump into a bundle
    Compile {
        /// Path to the LSIF JSON-lines dump
        dump: PathBuf,

        /// Directory the document paths are checked against for pruning
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Dump-relative root appended to the project root from the dump
        #[arg(short, long, default_value = "")]
        root: String,

        /// Identifier stamped into the bundle's package rows
        #[arg(short, long, default_value_t = 0)]
        dump_id: u64,

        /// Where to write the bundle JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look a position up in a compiled bundle
    Query {
        /// Path to a bundle produced by `compile`
        bundle: PathBuf,

        /// Document path relative to the project root
        path: String,

        /// Zero-based line
        line: u32,

        /// Zero-based character
        character: u32,
    },

    /// Show current configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });
    logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Compile {
            dump,
            project,
            root,
            dump_id,
            output,
        } => compile(&settings, dump, project, &root, dump_id, output),
        Commands::Query {
            bundle,
            path,
            line,
            character,
        } => run_query(bundle, &path, line, character),
        Commands::Config => show_config(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn compile(
    settings: &Settings,
    dump: PathBuf,
    project: PathBuf,
    root: &str,
    dump_id: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(&dump)?);
    let bundle = correlate_with_capacity(
        reader,
        dump_id,
        root,
        fs_directory_children(project),
        settings.correlate.reader_channel_capacity,
    )?;
    let maps = bundle.into_maps();

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer(&mut writer, &maps)?;
            writer.flush()?;
            eprintln!(
                "Wrote {} documents and {} result chunks to {}",
                maps.documents.len(),
                maps.result_chunks.len(),
                path.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer(&mut writer, &maps)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn run_query(bundle: PathBuf, path: &str, line: u32, character: u32) -> anyhow::Result<()> {
    let maps: GroupedBundleMaps = serde_json::from_reader(BufReader::new(File::open(&bundle)?))?;
    let results = query(&maps, path, line, character);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn show_config(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
