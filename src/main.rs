use clap::{Parser, Subcommand};
use spritegen::logger::{self, LogLevel, LoggerConfig};
use spritegen::{
    spritesheet, Asset, Collections, FileStore, GenerationMode, GenerationRequest,
    GeneratorConfig, SpriteGenError, SpriteGenerator,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "spritegen", version, about = "Generate pixel-art game sprites with Imagen")]
struct Cli {
    /// Directory holding history, favorites and the style lock
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON log lines instead of colored output
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate four sprites, or one animation with --animate
    Generate {
        /// What to draw; a random starter idea when omitted
        prompt: Option<String>,
        /// Generate a variation of an existing asset by reusing its prompt
        #[arg(long, conflicts_with = "prompt")]
        from: Option<String>,
        /// Elements the images should avoid
        #[arg(short, long)]
        negative: Option<String>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        animate: bool,
        /// Frames per animation (4-25)
        #[arg(short, long)]
        frames: Option<u32>,
        /// Ignore the current style lock for this generation
        #[arg(long)]
        no_style_lock: bool,
        /// Use local placeholder images instead of the API
        #[arg(long)]
        offline: bool,
    },
    /// List the generation history
    History,
    /// List favorites
    Favorites,
    /// Add or remove an asset from favorites
    Favorite { id: String },
    /// Reuse an asset's prompt as the style reference for new generations
    StyleLock {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
    /// Empty the history; favorites are kept
    ClearHistory,
    /// Export selected static images as one horizontal spritesheet
    Export {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Download an asset as PNG: images upscaled 4x, animations as one strip
    Save {
        id: String,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let logger_config = if cli.json_logs {
        LoggerConfig::production()
    } else if cli.verbose {
        LoggerConfig::development()
    } else {
        LoggerConfig::default()
    };
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        std::env::var("SPRITEGEN_LOG")
            .ok()
            .and_then(|name| LogLevel::parse(&name))
            .unwrap_or(LogLevel::Info)
    };
    logger::init_with_config(logger_config.with_level(level))?;

    if dotenv_loaded {
        log::debug!("✅ .env file loaded");
    }

    let mut config = GeneratorConfig::from_env();
    if let Some(store) = cli.store {
        config = config.with_store_dir(store);
    }
    logger::log_config_info(&config);

    let store = FileStore::new(&config.store_dir)?;
    let mut collections = Collections::load(&store)?;

    match cli.command {
        Command::Generate {
            prompt,
            from,
            negative,
            model,
            animate,
            frames,
            no_style_lock,
            offline,
        } => {
            let prompt = resolve_prompt(prompt, from.as_deref(), &collections)?;
            if let Some(model) = model {
                config = config.with_model(model);
            }
            if let Some(frames) = frames {
                config = config.with_frame_count(frames);
            }

            let (generator, credential) = if offline {
                (SpriteGenerator::offline(), "offline".to_string())
            } else {
                let credential = config.api_key.clone().filter(|key| !key.is_empty()).ok_or_else(|| {
                    SpriteGenError::ConfigError(
                        "Please set your Google API Key first (GEMINI_API_KEY).".into(),
                    )
                })?;
                (SpriteGenerator::from_config(&config)?, credential)
            };

            let mut request = GenerationRequest::new(credential, prompt, config.model.clone());
            if let Some(negative) = negative {
                request = request.with_negative_prompt(negative);
            }
            if !no_style_lock {
                if let Some(style) = collections.style_lock_prompt() {
                    log::info!("🎨 Style lock: \"{}\"", style);
                    request = request.with_style_lock(style);
                }
            }

            log::info!("🔄 Generating with {} provider...", generator.provider_name());
            let assets = if animate {
                let request = request.with_frame_count(config.frame_count);
                let cancel = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&cancel);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("⚠️  Cancelling before the next batch; press Ctrl-C again to quit now");
                        flag.store(true, Ordering::SeqCst);
                    }
                    if tokio::signal::ctrl_c().await.is_ok() {
                        std::process::exit(130);
                    }
                });
                vec![Asset::from(
                    generator.generate_animation_cancellable(&request, cancel).await?,
                )]
            } else {
                generator.generate(&request, GenerationMode::Static).await?
            };

            log::info!("✅ Generated {} asset(s)", assets.len());
            for asset in &assets {
                print_asset(asset, &collections);
            }
            collections.record(assets);
            collections.save(&store)?;
        }
        Command::History => {
            if collections.history().is_empty() {
                println!("Your generated assets will appear here. Try generating something new!");
            }
            for asset in collections.history() {
                print_asset(asset, &collections);
            }
        }
        Command::Favorites => {
            if collections.favorites().is_empty() {
                println!("Mark an asset as a favorite to see it here.");
            }
            for asset in collections.favorites() {
                print_asset(asset, &collections);
            }
        }
        Command::Favorite { id } => {
            let asset = find_asset(&collections, &id)?;
            if collections.toggle_favorite(&asset) {
                println!("★ {} added to favorites", id);
            } else {
                println!("☆ {} removed from favorites", id);
            }
            collections.save(&store)?;
        }
        Command::StyleLock { id, clear } => {
            match id {
                Some(id) if !clear => {
                    let asset = find_asset(&collections, &id)?;
                    collections.set_style_lock(&asset);
                    println!("🔒 Style locked to \"{}\"", asset.prompt());
                }
                _ if clear => {
                    collections.clear_style_lock();
                    println!("🔓 Style lock cleared");
                }
                _ => match collections.style_lock() {
                    Some(asset) => println!("🔒 {} \"{}\"", asset.id(), asset.prompt()),
                    None => println!("No style lock set"),
                },
            }
            collections.save(&store)?;
        }
        Command::ClearHistory => {
            collections.clear_history();
            collections.save(&store)?;
            println!("History cleared; favorites kept");
        }
        Command::Export { ids, out } => {
            let png = spritesheet::export_selected(&collections, &ids)?;
            let path = out.unwrap_or_else(|| PathBuf::from(spritesheet::spritesheet_file_name()));
            fs::write(&path, png)?;
            println!("💾 Spritesheet saved to {}", path.display());
        }
        Command::Save { id, out } => {
            let asset = find_asset(&collections, &id)?;
            fs::create_dir_all(&out)?;
            let path = save_asset(&asset, &out)?;
            println!("💾 {}", path.display());
        }
    }

    Ok(())
}

fn resolve_prompt(
    prompt: Option<String>,
    from: Option<&str>,
    collections: &Collections,
) -> spritegen::Result<String> {
    if let Some(id) = from {
        let asset = find_asset(collections, id)?;
        log::info!("🔁 Variation of {}: \"{}\"", id, asset.prompt());
        return Ok(asset.prompt().to_string());
    }

    match prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
        Some(_) => Err(SpriteGenError::ConfigError("Please enter a prompt.".into())),
        None => {
            let idea = spritegen::prompt::inspire();
            log::info!("💡 No prompt given, trying \"{}\"", idea);
            Ok(idea.to_string())
        }
    }
}

fn find_asset(collections: &Collections, id: &str) -> spritegen::Result<Asset> {
    collections
        .find(id)
        .cloned()
        .ok_or_else(|| SpriteGenError::StorageError(format!("no asset with id {}", id)))
}

fn print_asset(asset: &Asset, collections: &Collections) {
    let star = if collections.is_favorite(asset.id()) { "★" } else { " " };
    let locked = collections
        .style_lock()
        .map_or(false, |lock| lock.id() == asset.id());
    let kind = match asset {
        Asset::Image(_) => "image".to_string(),
        Asset::Animation(animation) => format!("anim x{}", animation.frames.len()),
    };
    println!(
        "{} {:<24} {:<10} {}{}",
        star,
        asset.id(),
        kind,
        asset.prompt(),
        if locked { "  🔒" } else { "" }
    );
}

fn save_asset(asset: &Asset, dir: &std::path::Path) -> spritegen::Result<PathBuf> {
    let (name, png) = spritesheet::download(asset)?;
    let path = dir.join(name);
    fs::write(&path, png)?;
    Ok(path)
}
