mod cli;

use clap::Parser;
use cli::{Args, Command, GenomeCommand};
use pulse_control::Daemon;
use pulse_core::config::PulseConfig;
use pulse_drives::{ConversationSensor, FilesystemSensor, Sensor, SystemSensor};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(args: &Args) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if let Some(ref log_path) = args.log_file {
        let file_appender = tracing_appender::rolling::daily(
            log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
            log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("pulse.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        if args.log_json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }
    } else if args.log_json {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}

fn load_config(args: &Args) -> PulseConfig {
    match &args.config {
        Some(path) => PulseConfig::load_or_default(path),
        None => PulseConfig::load_or_default(default_config_path()),
    }
}

fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join("pulse").join("pulse.toml")
}

/// Registers every nervous-system module into the shared registry in
/// dependency order, so readers (Phenotype, Aura, Retina) find their
/// collaborators already present when they're constructed.
fn build_registry(ctx: &pulse_bus::PulseContext, known_drives: Arc<Mutex<Vec<String>>>) -> Arc<pulse_modules::Hypothalamus> {
    let registry = &ctx.registry;
    let bus = ctx.bus.clone();
    let clock = ctx.clock.clone();

    registry.register("adipose", Arc::new(pulse_modules::Adipose::new()));
    registry.register("buffer", Arc::new(pulse_modules::Buffer::new()));
    registry.register("dendrite", Arc::new(pulse_modules::Dendrite::new()));
    registry.register("enteric", Arc::new(pulse_modules::Enteric::new()));
    registry.register("genome", Arc::new(pulse_modules::Genome::new()));
    registry.register("immune", Arc::new(pulse_modules::Immune::new()));
    registry.register("mirror", Arc::new(pulse_modules::Mirror::new()));
    registry.register("pons_rem", Arc::new(pulse_modules::PonsRem::new()));
    registry.register("vagus", Arc::new(pulse_modules::Vagus::new()));

    registry.register("amygdala", Arc::new(pulse_modules::Amygdala::new(bus.clone(), clock.clone())));
    registry.register("circadian", Arc::new(pulse_modules::Circadian::new(bus.clone(), clock.clone())));
    registry.register("endocrine", Arc::new(pulse_modules::Endocrine::new(bus.clone(), clock.clone())));
    registry.register("myelin", Arc::new(pulse_modules::Myelin::new(bus.clone(), clock.clone())));
    registry.register("telomere", Arc::new(pulse_modules::Telomere::new(bus.clone(), clock.clone())));
    registry.register("nephron", Arc::new(pulse_modules::Nephron::new(bus.clone())));
    registry.register("spine", Arc::new(pulse_modules::Spine::new(bus.clone())));
    registry.register("thymus", Arc::new(pulse_modules::Thymus::new(bus.clone())));
    registry.register("vestibular", Arc::new(pulse_modules::Vestibular::new(bus.clone())));

    registry.register("limbic", Arc::new(pulse_modules::Limbic::new(clock.clone())));
    registry.register("oximeter", Arc::new(pulse_modules::Oximeter::new(clock.clone())));
    registry.register("proprioception", Arc::new(pulse_modules::Proprioception::new(clock.clone())));
    registry.register("soma", Arc::new(pulse_modules::Soma::new(clock.clone())));

    registry.register("chronicle", Arc::new(pulse_modules::Chronicle::new(&ctx.state_dir, clock.clone())));
    registry.register(
        "cerebellum",
        Arc::new(pulse_modules::Cerebellum::new(bus.clone(), clock.clone(), ctx.state_dir.join("scripts"))),
    );

    let existing_drive = move |name: &str| known_drives.lock().expect("drive-name lock poisoned").iter().any(|n| n == name);
    let hypothalamus = Arc::new(pulse_modules::Hypothalamus::new(bus.clone(), clock.clone(), existing_drive));
    registry.register("hypothalamus", hypothalamus.clone());

    // Readers that look other modules up by name go last, once their
    // collaborators are already present.
    registry.register("phenotype", Arc::new(pulse_modules::Phenotype::new(registry.clone())));
    registry.register("retina", Arc::new(pulse_modules::Retina::new(registry.clone())));
    registry.register("aura", Arc::new(pulse_modules::Aura::new(registry.clone(), bus.clone(), clock.clone())));

    hypothalamus
}

fn build_sensors(config: &PulseConfig) -> Vec<Box<dyn Sensor>> {
    vec![
        Box::new(FilesystemSensor::new(vec![config.workspace.root.clone(), config.workspace.daily_notes.clone()], 48.0)),
        Box::new(SystemSensor::new(config.workspace.root.clone(), 5.0)),
        Box::new(ConversationSensor::new(1800)),
    ]
}

async fn run(config: PulseConfig) -> anyhow::Result<()> {
    let ctx = pulse_bus::PulseContext::new(config.clone())?;
    let known_drives = Arc::new(Mutex::new(config.drives.iter().map(|d| d.name.clone()).collect::<Vec<_>>()));
    let hypothalamus = build_registry(&ctx, known_drives);
    let sensors = build_sensors(&config);
    let daemon = Daemon::new(ctx, sensors, Some(hypothalamus))?;
    daemon.run().await
}

fn genome_path(state_dir: &std::path::Path) -> std::path::PathBuf {
    state_dir.join("genome.toml")
}

fn run_genome(config: &PulseConfig, command: GenomeCommand) -> anyhow::Result<()> {
    let genome = pulse_modules::Genome::new();
    let saved = genome_path(&config.pulse.state_dir);
    if saved.exists() {
        let text = std::fs::read_to_string(&saved)?;
        genome.import_toml(&text)?;
    }

    match command {
        GenomeCommand::Export { out } => {
            let text = genome.export_toml()?;
            match out {
                Some(path) => std::fs::write(path, text)?,
                None => println!("{text}"),
            }
        }
        GenomeCommand::Import { path } => {
            let text = std::fs::read_to_string(&path)?;
            genome.import_toml(&text)?;
            std::fs::create_dir_all(&config.pulse.state_dir)?;
            std::fs::write(&saved, genome.export_toml()?)?;
            println!("imported genome from {}", path.display());
        }
        GenomeCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&genome.show())?);
        }
        GenomeCommand::Diff { path } => {
            let text = std::fs::read_to_string(&path)?;
            let other: pulse_modules::genome::GenomeData = toml::from_str(&text)?;
            let diffs = genome.diff(&other);
            if diffs.is_empty() {
                println!("no differences");
            } else {
                for diff in diffs {
                    println!("{}: {} -> {}", diff.field, diff.before, diff.after);
                }
            }
        }
    }
    Ok(())
}

fn run_status(config: &PulseConfig) -> anyhow::Result<()> {
    let path = config.pulse.state_dir.join("pulse-state.json");
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => {
            println!("no checkpoint found at {}", path.display());
            return Ok(());
        }
    };

    let value: serde_json::Value = serde_json::from_str(&text)?;
    println!("turn: {}", value.get("turn").unwrap_or(&serde_json::Value::Null));
    match value.get("last_trigger_ts").and_then(|v| v.as_i64()) {
        Some(ms) => {
            let ts = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339()).unwrap_or_else(|| ms.to_string());
            println!("last trigger: {ts}");
        }
        None => println!("last trigger: never"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);
    let config = load_config(&args);

    let result = match args.command {
        Command::Run => run(config).await,
        Command::Genome(genome_args) => run_genome(&config, genome_args.command),
        Command::Status => run_status(&config),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "pulse exited with an error");
    }
    result
}
