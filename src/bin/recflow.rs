//! recflow CLI - run record chains from a YAML chain file
//!
//! Also hosts a small demo of the typed entity properties (`keys`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use recflow::rules::combat::{self, CombatKeys, WarriorSpec};
use recflow::{ChainFile, DataFlowServiceFactory, KeyRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recflow")]
#[command(version, about = "Run configurable record transformation chains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute chains from a chain file
    Run {
        /// Path to the chain file
        #[arg(short, long, default_value = "config/chains.yaml")]
        config: PathBuf,

        /// Run only the chain with this name
        #[arg(long)]
        chain: Option<String>,
    },

    /// Load and validate a chain file without running it
    Validate {
        /// Path to the chain file
        #[arg(short, long, default_value = "config/chains.yaml")]
        config: PathBuf,
    },

    /// Run the combat rule demo and list the registered keys
    Keys {
        /// Multiplier applied to granted XP
        #[arg(long, default_value = "1.5")]
        xp_multiplier: f64,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, chain } => run_chains(config, chain),
        Commands::Validate { config } => validate_chains(config),
        Commands::Keys { xp_multiplier } => run_keys_demo(xp_multiplier),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_chains(config: &PathBuf) -> Result<ChainFile, String> {
    let file = ChainFile::from_file(config)
        .map_err(|e| format!("Failed to load {}: {}", config.display(), e))?;
    file.validate().map_err(|e| e.to_string())?;
    Ok(file)
}

fn run_chains(config: PathBuf, only: Option<String>) -> Result<(), String> {
    let file = load_chains(&config)?;

    let selected: Vec<_> = match &only {
        Some(name) => vec![file
            .get(name)
            .ok_or_else(|| format!("Chain '{}' not found in {}", name, config.display()))?],
        None => file.chains.iter().collect(),
    };

    for (idx, chain) in selected.iter().enumerate() {
        tracing::info!("Running chain '{}'", chain.name);
        let flow = DataFlowServiceFactory::create(&chain.config).map_err(|e| e.to_string())?;
        let result = flow.execute().map_err(|e| format!("Chain '{}' failed: {}", chain.name, e))?;

        println!("Chain #{}: {}", idx + 1, chain.name);
        println!(" read_count = {}", result.read_count);
        println!(" written_count = {}", result.written_count);
        println!(" steps = {}", result.steps.join(", "));
        println!();
    }
    Ok(())
}

fn validate_chains(config: PathBuf) -> Result<(), String> {
    let file = load_chains(&config)?;
    println!("✓ {} chain(s) valid in {}", file.chains.len(), config.display());
    for chain in &file.chains {
        println!("  - {}", chain.name);
    }
    Ok(())
}

fn run_keys_demo(xp_multiplier: f64) -> Result<(), String> {
    let registry = KeyRegistry::standard();
    let keys = Arc::new(CombatKeys::register(&registry).map_err(|e| e.to_string())?);

    let mut warrior = combat::create_warrior(
        &keys,
        WarriorSpec {
            entity_id: "E-100".to_string(),
            name: "Arthas".to_string(),
            faction: "Alliance".to_string(),
            health: 120,
            armor: 25,
            damage: 40,
        },
    )
    .map_err(|e| e.to_string())?;

    let mut context =
        combat::create_operation_context(&keys, xp_multiplier, true).map_err(|e| e.to_string())?;
    let pipeline = combat::build_pipeline_for(&keys, &warrior);

    println!("Pipeline steps: {}", pipeline.describe().join(", "));
    pipeline
        .execute(&mut warrior, &mut context)
        .map_err(|e| e.to_string())?;

    println!("\nFinal entity snapshot:");
    for (name, value) in warrior.snapshot() {
        println!("  {} = {}", name, value);
    }

    println!("\nOperation trace:");
    for line in combat::read_trace(&keys, &context).map_err(|e| e.to_string())? {
        println!("- {}", line);
    }

    println!("\nCross-project registry check:");
    println!("{}", combat::demonstrate_registry_conflict(&registry));

    println!("\nRegistered keys in registry:");
    for key in registry.all_keys() {
        println!("[{}] {} ({}) owner={}", key.id, key.name, key.value_type, key.owner);
    }
    Ok(())
}
