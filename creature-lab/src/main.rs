//! Creature Lab - generate, evolve and collect AI-designed creatures.
//!
//! A line-oriented terminal front end over `creature-core`:
//!
//! ```bash
//! cargo run -p creature-lab -- --style ink_wash
//! ```

mod render;
mod repl;

use creature_core::{ArtStyle, ConfigError, LabConfig, LabError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CREATURE_LAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let (config, key) = parse_config_from_args(&args);
    info!(
        data_dir = %config.data_dir.display(),
        style = %config.style_id,
        text_model = %config.text_model,
        image_model = %config.image_model,
        "starting creature lab"
    );

    if let Some(key) = key {
        config.credentials().set(&key).await?;
    }

    if let Err(e) = repl::run(config).await {
        eprintln!("Error: {e}");
        if matches!(e, LabError::Config(ConfigError::NoApiKey)) {
            eprintln!("Set GEMINI_API_KEY in .env or the environment, or pass --key <KEY>.");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Parse lab configuration from command line arguments.
fn parse_config_from_args(args: &[String]) -> (LabConfig, Option<String>) {
    let mut config = LabConfig::from_env();
    let mut key = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data-dir" => {
                if let Some(dir) = args.get(i + 1) {
                    config = config.with_data_dir(dir);
                    i += 1;
                }
            }
            "--style" => {
                if let Some(style) = args.get(i + 1) {
                    if ArtStyle::find(style).is_none() {
                        eprintln!("Unknown style '{style}', using {}", ArtStyle::resolve(style).id);
                    }
                    config = config.with_style(style);
                    i += 1;
                }
            }
            "--key" => {
                if let Some(k) = args.get(i + 1) {
                    key = Some(k.clone());
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    (config, key)
}

fn print_help() {
    println!("Creature Lab - AI creature generator");
    println!();
    println!("USAGE:");
    println!("  creature-lab [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --data-dir <DIR>    Where the gallery and custom key live (default: .creature-lab)");
    println!("  --style <ID>        Initial art style (default: fantasy_concept)");
    println!("  --key <KEY>         Store a custom Gemini API key before starting");
    println!();
    println!("STYLES:");
    for style in creature_core::ART_STYLES {
        println!("  {:<16} {}", style.id, style.label);
    }
    println!();
    println!("ENVIRONMENT:");
    println!("  GEMINI_API_KEY, API_KEY           API key (a stored custom key wins)");
    println!("  GEMINI_TEXT_MODEL, GEMINI_IMAGE_MODEL");
    println!("  CREATURE_LAB_DATA_DIR             Same as --data-dir");
    println!("  CREATURE_LAB_LOG                  Log filter, e.g. info or creature_core=debug");
}
