//! Force Generator - Command line tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use forcegen_core::force::{ForceDescriptor, ForceTreeBuilder};
use forcegen_core::parameters::Parameters;
use forcegen_core::rat_generator::RatGenerator;
use forcegen_core::unit_kind::{UnitType, WeightClass};
use forcegen_tools::data_loader::{self, DataSet};
use forcegen_tools::report::{self, TableReport};
use forcegen_tools::validate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forcegen")]
#[command(about = "Random assignment tables and force generation")]
struct Cli {
    /// Data directory (defaults to $FORCEGEN_DATA_DIR or the bundled data)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        path: Option<PathBuf>,
    },
    /// Print a random assignment table
    Table {
        /// Faction key
        #[arg(long)]
        faction: String,
        /// Unit type, e.g. Mek, Tank, VTOL
        #[arg(short, long, value_parser = report::parse_unit_type, default_value = "Mek")]
        unit_type: UnitType,
        /// Game year
        #[arg(short, long)]
        year: i32,
        /// Equipment rating level
        #[arg(short, long)]
        rating: Option<String>,
        /// Faction fielding the units
        #[arg(long)]
        deploying: Option<String>,
        /// Allowed weight classes (repeatable)
        #[arg(short, long = "weight-class", value_parser = report::parse_weight_class)]
        weight_classes: Vec<WeightClass>,
    },
    /// Generate a force from a RON descriptor
    Generate {
        /// Force descriptor file
        descriptor: PathBuf,
        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// List formation templates
    Formations,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => cmd_validate(path.or(cli.data).as_deref()),
        Commands::Table {
            faction,
            unit_type,
            year,
            rating,
            deploying,
            weight_classes,
        } => {
            let mut query =
                Parameters::new(faction, unit_type, year).with_weight_classes(weight_classes);
            query.rating = rating;
            query.deploying_faction = deploying;
            cmd_table(cli.data.as_deref(), query, cli.format)
        }
        Commands::Generate { descriptor, seed } => {
            cmd_generate(cli.data.as_deref(), &descriptor, seed, cli.format)
        }
        Commands::Formations => cmd_formations(cli.data.as_deref()),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn resolve_data_dir(data: Option<&Path>) -> Result<PathBuf, String> {
    data.map(Path::to_path_buf)
        .or_else(data_loader::default_data_dir)
        .ok_or_else(|| {
            format!(
                "No data directory found; pass --data or set {}",
                data_loader::DATA_DIR_ENV
            )
        })
}

fn cmd_validate(data: Option<&Path>) -> CmdResult {
    let dir = resolve_data_dir(data)?;
    tracing::info!("Validating data files in: {}", dir.display());
    let report = validate::validate_data_directory(&dir)?;
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    for error in &report.errors {
        tracing::error!("{error}");
    }
    if !report.is_valid() {
        return Err(format!("Validation failed with {} errors", report.errors.len()).into());
    }
    tracing::info!("Validation passed");
    Ok(())
}

fn cmd_table(data: Option<&Path>, query: Parameters, format: Format) -> CmdResult {
    let dir = resolve_data_dir(data)?;
    let mut generator = RatGenerator::from_handle(data_loader::spawn_load(dir)?)?;
    let table = generator.generate_table(&query);
    let report = TableReport::new(query, &table);
    match format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_generate(data: Option<&Path>, descriptor: &Path, seed: u64, format: Format) -> CmdResult {
    let dir = resolve_data_dir(data)?;
    let text = std::fs::read_to_string(descriptor)
        .map_err(|e| format!("Failed to read {}: {e}", descriptor.display()))?;
    let descriptor = ForceDescriptor::from_ron_str(&text)?;

    let data = DataSet::load(&dir)?;
    let registry = data.formation_registry();
    let mut generator = RatGenerator::new(data.generator_data()?);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!("Generating '{}' with seed {seed}", descriptor.name);
    let force = ForceTreeBuilder::new(&mut generator, &registry).build(&descriptor, &mut rng)?;

    match format {
        Format::Text => print!("{}", report::render_force(&force)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&force)?),
    }
    Ok(())
}

fn cmd_formations(data: Option<&Path>) -> CmdResult {
    let registry = match resolve_data_dir(data) {
        Ok(dir) => DataSet::load(&dir)?.formation_registry(),
        Err(_) => forcegen_core::formation::FormationRegistry::standard(),
    };
    for formation in registry.iter() {
        println!("{}", formation.name);
        for constraint in &formation.constraints {
            if !constraint.description().is_empty() {
                println!("  - {}", constraint.description());
            }
        }
    }
    Ok(())
}
