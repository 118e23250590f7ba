//! Galaxy Intent - command line entry point
//!
//! Loads a scene exported by the level loader and runs object resolution,
//! projections or provider commands against it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use galaxy_intent::cache::ContextCache;
use galaxy_intent::command::{ObjectResolver, ResolutionResult};
use galaxy_intent::core::error::Result;
use galaxy_intent::core::types::Vec3;
use galaxy_intent::core::GalaxyConfig;
use galaxy_intent::llm::context::scene_summary;
use galaxy_intent::llm::{DetailLevel, ProviderOrchestrator, SceneProjector, TomlSettingsStore};
use galaxy_intent::scene::{ContextBuilder, SceneDocument, SceneSnapshot};

/// Natural language object resolution for galaxy levels
#[derive(Parser, Debug)]
#[command(name = "galaxy-intent")]
#[command(about = "Resolve object references and run editing commands against a galaxy scene")]
struct Args {
    /// Configuration file; created when the active provider is changed
    #[arg(long, default_value = "galaxy-intent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a text reference to scene objects
    Resolve {
        /// Scene JSON file
        #[arg(long)]
        scene: PathBuf,

        /// Reference such as "goomba1", "all coins" or "the start"
        reference: String,

        /// Allow "all X", lists and plurals
        #[arg(long, short = 'm')]
        multiple: bool,

        /// Use spatial resolution ("near"/"far") around this point, as x,y,z
        #[arg(long, value_parser = parse_vec3)]
        origin: Option<Vec3>,
    },

    /// Print the JSON projection of a scene
    Project {
        #[arg(long)]
        scene: PathBuf,

        /// minimal, standard, detailed or spatial
        #[arg(long)]
        level: Option<DetailLevel>,

        /// Compact relevance-ordered projection instead
        #[arg(long)]
        ai: bool,

        /// Object cap for --ai
        #[arg(long)]
        max_objects: Option<usize>,
    },

    /// List providers, or switch the active one
    Providers {
        /// Provider id to make active
        #[arg(long)]
        set: Option<String>,
    },

    /// Send an editing command through the provider chain
    Execute {
        #[arg(long)]
        scene: PathBuf,

        command: String,
    },
}

fn parse_vec3(value: &str) -> std::result::Result<Vec3, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{}: {}", p, e)))
        .collect::<std::result::Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got '{}'", value)),
    }
}

fn load_config(path: &Path) -> Result<GalaxyConfig> {
    if path.exists() {
        Ok(GalaxyConfig::load_from_toml(path)?)
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Ok(GalaxyConfig::default())
    }
}

fn load_scene(builder: &ContextBuilder, path: &Path) -> Result<Arc<SceneSnapshot>> {
    let document = SceneDocument::load(path)?;
    Ok(builder.snapshot(&document)?)
}

fn print_resolution(result: &ResolutionResult<'_>) {
    if !result.success {
        println!("{}", result.error.as_deref().unwrap_or("resolution failed"));
        return;
    }
    for candidate in &result.candidates {
        println!(
            "{:>6}  {:<24} {:.3}  {}",
            candidate.id(),
            candidate.record.name(),
            candidate.confidence,
            candidate.reason
        );
    }
    if result.needs_disambiguation {
        println!("(ambiguous: several objects match about equally well)");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("galaxy_intent=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    let cache = Arc::new(ContextCache::new(config.cache.clone()));
    let builder = ContextBuilder::new(Arc::clone(&cache));

    match args.command {
        Command::Resolve {
            scene,
            reference,
            multiple,
            origin,
        } => {
            let snapshot = load_scene(&builder, &scene)?;
            let resolver = ObjectResolver::new(&snapshot);
            let result = match origin {
                Some(origin) => resolver.resolve_spatial(&reference, origin),
                None if multiple => resolver.resolve_multiple(&reference),
                None => resolver.resolve(&reference),
            };
            print_resolution(&result);
        }

        Command::Project {
            scene,
            level,
            ai,
            max_objects,
        } => {
            let snapshot = load_scene(&builder, &scene)?;
            let projector = SceneProjector::new(&config.projection);
            let value = if ai {
                let max = max_objects.unwrap_or(config.projection.ai_max_objects);
                Arc::new(projector.project_for_ai(&snapshot, max, Vec3::ZERO))
            } else {
                let level = level.unwrap_or(config.projection.default_level);
                projector.project_cached(&cache, &snapshot, level)
            };
            println!("{}", serde_json::to_string_pretty(value.as_ref())?);
            eprintln!("{}", scene_summary(&snapshot));
        }

        Command::Providers { set } => {
            let settings = Arc::new(TomlSettingsStore::new(&args.config));
            let orchestrator = ProviderOrchestrator::with_http_providers(&config, cache, settings)?;
            if let Some(id) = set {
                orchestrator.set_active(&id)?;
                println!("Active provider: {}", id);
            }
            for health in orchestrator.health_check() {
                println!(
                    "{} {:<10} available={:<5} streaming={}",
                    if health.active { "*" } else { " " },
                    health.id,
                    health.available,
                    health.streaming
                );
            }
            match orchestrator.first_available() {
                Some(id) => println!("First available: {}", id),
                None => println!("No provider available; set an API key or start a local server"),
            }
        }

        Command::Execute { scene, command } => {
            let snapshot = load_scene(&builder, &scene)?;
            let settings = Arc::new(TomlSettingsStore::new(&args.config));
            let orchestrator = ProviderOrchestrator::with_http_providers(&config, cache, settings)?;

            let rt = Runtime::new()?;
            match rt.block_on(orchestrator.execute(&command, &snapshot)) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    for warning in &result.warnings {
                        eprintln!("warning: {}", warning);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Command failed");
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
