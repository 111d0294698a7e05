use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use docnorm_core::config::read_document;
use docnorm_core::{
    assign_identities, collect_field_values, collect_fields, compute_identity, concatenate,
    generate_map_skeleton, group_records, project_records, Dataset, Error, FieldSchema,
    GroupingSpec, NormalizationMap, Normalizer, Pipeline, PipelineConfig, Result,
};

/// docnorm - record normalization and canonicalization engine
///
/// Project, normalize, identify, and group JSON record sets.
#[derive(Parser)]
#[command(name = "docnorm", version, about, long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join several record files into one sequence
    Concatenate {
        /// Files holding JSON arrays of records
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List every field name seen across record files, sorted
    CollectFields {
        /// Record files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Project records onto a field schema
    Project {
        /// JSON array of field names to keep
        #[arg(long)]
        fields: PathBuf,
        /// Record file
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Survey the distinct values of every field
    CollectValues {
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate an editable normalization map from surveyed values
    GenerateMap {
        /// Output of `collect-values`
        #[arg(long)]
        values: PathBuf,
        /// Restrict the map to these fields
        #[arg(long)]
        fields: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize records with a normalization map
    Normalize {
        /// Normalization map (JSON or YAML)
        #[arg(long)]
        map: PathBuf,
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Assign content-derived identities
    AddIds {
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reshape records into nested documents
    Group {
        /// Grouping specification (JSON or YAML)
        #[arg(long)]
        grouping: PathBuf,
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the identity of a single record
    Identity {
        /// File holding one JSON object
        #[arg(long)]
        record: PathBuf,
    },

    /// Run the full pipeline: project, normalize, identify, group
    Run {
        /// Pipeline configuration (JSON or YAML)
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write every intermediate stage into this directory
        #[arg(long)]
        stages_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let quiet = cli.quiet;
    let exit_code = match execute(cli.command, quiet) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            if err.is_config_error() {
                1
            } else {
                2
            }
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(command: Commands, quiet: bool) -> Result<()> {
    let status = |message: String| {
        if !quiet {
            eprintln!("{} {}", "✓".green(), message);
        }
    };

    match command {
        Commands::Concatenate { files, output } => {
            let mut documents = Vec::with_capacity(files.len());
            for path in &files {
                match read_document::<Value>(path) {
                    Ok(document) => documents.push((path.display().to_string(), document)),
                    Err(err) => {
                        tracing::warn!(
                            source = %path.display(),
                            error = %err,
                            "unreadable file; skipping"
                        );
                    }
                }
            }
            let records = concatenate(documents);
            let count = records.len();
            write_output(&Value::Array(records), output.as_deref())?;
            status(format!("concatenated {} records from {} files", count, files.len()));
        }

        Commands::CollectFields { files, output } => {
            let mut records = Vec::new();
            for path in &files {
                records.extend(read_dataset(path)?.into_records());
            }
            let fields = collect_fields(&records);
            write_output(&serde_json::to_value(&fields)?, output.as_deref())?;
            status(format!("collected {} fields", fields.len()));
        }

        Commands::Project {
            fields,
            data,
            output,
        } => {
            let names: Vec<String> = read_document(&fields)?;
            let schema = FieldSchema::new(names)?;
            let dataset = read_dataset(&data)?;
            let projected = dataset.map_records(|records| project_records(records, &schema));
            write_output(&projected.into_value(), output.as_deref())?;
            status(format!(
                "projected {} records onto {} fields",
                dataset.record_count(),
                schema.len()
            ));
        }

        Commands::CollectValues { data, output } => {
            let records = read_dataset(&data)?.into_records();
            let values = collect_field_values(&records);
            write_output(&serde_json::to_value(&values)?, output.as_deref())?;
            status(format!("surveyed {} fields", values.len()));
        }

        Commands::GenerateMap {
            values,
            fields,
            output,
        } => {
            let field_values = read_document(&values)?;
            let keep: Option<Vec<String>> = fields
                .as_deref()
                .map(read_document::<Vec<String>>)
                .transpose()?;
            let map = generate_map_skeleton(&field_values, keep.as_deref());
            write_output(&serde_json::to_value(&map)?, output.as_deref())?;
            status(format!("generated rules for {} fields", map.len()));
        }

        Commands::Normalize { map, data, output } => {
            let normalizer = Normalizer::new(&NormalizationMap::load(&map)?)?;
            let dataset = read_dataset(&data)?;
            let normalized = dataset.map_records(|records| normalizer.normalize_records(records));
            write_output(&normalized.into_value(), output.as_deref())?;
            status(format!("normalized {} records", dataset.record_count()));
        }

        Commands::AddIds { data, output } => {
            let dataset = read_dataset(&data)?;
            let identified = dataset.map_records(assign_identities);
            write_output(&identified.into_value(), output.as_deref())?;
            status(format!("assigned {} identities", dataset.record_count()));
        }

        Commands::Group {
            grouping,
            data,
            output,
        } => {
            let spec = GroupingSpec::load(&grouping)?;
            let dataset = read_dataset(&data)?;
            let grouped = dataset.map_records(|records| group_records(records, &spec));
            write_output(&grouped.into_value(), output.as_deref())?;
            status(format!(
                "grouped {} records ({} levels)",
                dataset.record_count(),
                spec.depth()
            ));
        }

        Commands::Identity { record } => {
            let value: Value = read_document(&record)?;
            if !value.is_object() {
                return Err(Error::InvalidInput(format!(
                    "{} does not hold a JSON object",
                    record.display()
                )));
            }
            println!("{}", compute_identity(&value));
        }

        Commands::Run {
            config,
            data,
            output,
            stages_dir,
        } => {
            let pipeline = Pipeline::new(&PipelineConfig::load(&config)?)?;
            let dataset = read_dataset(&data)?;
            let result = pipeline.run(&dataset);

            if let Some(dir) = &stages_dir {
                fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
                for (name, stage) in result.stages() {
                    let path = dir.join(format!("{}.json", name));
                    write_output(&stage.clone().into_value(), Some(&path))?;
                }
            }
            let records = result.grouped.record_count();
            write_output(&result.grouped.into_value(), output.as_deref())?;
            status(format!("pipeline produced {} records", records));
        }

        Commands::Version => {
            println!(
                "docnorm {} (docnorm-core {})",
                env!("CARGO_PKG_VERSION"),
                docnorm_core::VERSION
            );
        }
    }

    Ok(())
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    Dataset::from_value(read_document(path)?)
}

/// Write pretty JSON to `path`, or to stdout when no path is given
fn write_output(value: &Value, path: Option<&Path>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    match path {
        Some(path) => fs::write(path, text).map_err(|e| Error::io(path, e)),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
