//! Line-oriented front end for the creature lab.
//!
//! Plain lines are creation prompts. Lines starting with `#` are commands.

use crate::render::{self, Layout};
use creature_core::prompts::default_pre_evolution_name;
use creature_core::{ArtStyle, CreatureLab, GeminiGenerator, LabConfig, LabError, ART_STYLES};
use std::io::{self, BufRead, Write};

const HELP: &[(&str, &str)] = &[
    ("<prompt>", "Create a creature from a description"),
    ("#name [name]", "Force the next creature's name (no argument clears it)"),
    ("#style <id>", "Choose the art style"),
    ("#styles", "List art styles"),
    ("#layout full|compact", "Choose the card layout"),
    ("#optimize <text>", "Rewrite a short idea into a full prompt"),
    ("#random", "Invent a prompt"),
    ("#evolve", "Evolve the current creature"),
    ("#ultimate", "Awaken the ultimate form"),
    ("#pre [name]", "Create the younger form"),
    ("#retry-image", "Redraw after a failed image"),
    ("#gallery", "List saved creatures"),
    ("#view <name>", "Show a saved creature"),
    ("#delete <id>", "Remove a saved creature"),
    ("#key <key>|clear", "Store or forget a custom API key"),
    ("#status", "Show the lab state"),
    ("#help", "Show this help"),
    ("#quit", "Exit"),
];

/// Run the lab until `#quit` or end of input.
pub async fn run(mut config: LabConfig) -> Result<(), LabError> {
    let mut lab = CreatureLab::open(&config).await?;
    let mut custom_name: Option<String> = None;
    let mut layout = Layout::default();

    println!("=== Creature Lab ===");
    println!("Style: {} ({})", lab.style().label, lab.style().id);
    println!("Gallery: {} creature(s)", lab.history().len());
    println!("Type a description to create a creature, or #help for commands.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            print!("[GENERATING]");
            stdout.flush().ok();
            let result = lab.create(line, custom_name.as_deref()).await;
            clear_indicator(&mut stdout);
            report_cycle(&lab, layout, result);
            continue;
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "help" => print_help(),
            "name" => {
                custom_name = (!arg.is_empty()).then(|| arg.to_string());
                match &custom_name {
                    Some(n) => println!("[NAME] Next creature will be named {n}"),
                    None => println!("[NAME] Name override cleared"),
                }
            }
            "styles" => {
                for style in ART_STYLES {
                    let marker = if style.id == lab.style().id { "*" } else { " " };
                    println!("  {marker} {:<16} {}", style.id, style.label);
                }
            }
            "layout" => match Layout::parse(arg) {
                Some(chosen) => {
                    layout = chosen;
                    println!("[LAYOUT] {layout:?}");
                    print_current(&lab, layout);
                }
                None => println!("[ERROR] Usage: #layout full|compact"),
            },
            "style" => match lab.set_style(arg) {
                Ok(()) => println!("[STYLE] {} ({})", lab.style().label, lab.style().id),
                Err(e) => println!("[ERROR] {e}"),
            },
            "optimize" => match lab.optimize_prompt(arg).await {
                Ok(prompt) => println!("[PROMPT] {prompt}"),
                Err(e) => println!("[ERROR] Usage: #optimize <text> ({e})"),
            },
            "random" => println!("[PROMPT] {}", lab.random_prompt().await),
            "evolve" | "ultimate" => {
                let ultimate = name == "ultimate";
                let allowed = lab.lineage().is_some_and(|l| {
                    if ultimate {
                        l.eligibility.can_ultimate_evolve
                    } else {
                        l.eligibility.can_evolve
                    }
                });
                if !allowed {
                    println!("[ERROR] The current creature cannot use #{name}");
                } else {
                    print!("[GENERATING]");
                    stdout.flush().ok();
                    let result = lab.evolve(ultimate).await;
                    clear_indicator(&mut stdout);
                    report_cycle(&lab, layout, result);
                }
            }
            "pre" => {
                let Some(current) = lab.current() else {
                    println!("[ERROR] No current creature");
                    continue;
                };
                if !lab.lineage().is_some_and(|l| l.eligibility.can_pre_evolve) {
                    println!("[ERROR] {} already has an earlier form", current.name);
                    continue;
                }
                let target = if arg.is_empty() {
                    default_pre_evolution_name(&current.name)
                } else {
                    arg.to_string()
                };
                print!("[GENERATING]");
                stdout.flush().ok();
                let result = lab.generate_pre_evolution(&target).await;
                clear_indicator(&mut stdout);
                report_cycle(&lab, layout, result);
            }
            "retry-image" => {
                print!("[GENERATING]");
                stdout.flush().ok();
                let result = lab.retry_image().await;
                clear_indicator(&mut stdout);
                report_cycle(&lab, layout, result);
            }
            "gallery" => {
                println!("[GALLERY]");
                print!("{}", render::gallery(lab.history().records()));
            }
            "view" => match lab.select(arg).map(|_| ()) {
                Ok(()) => print_current(&lab, layout),
                Err(e) => println!("[ERROR] {e}"),
            },
            "delete" => match lab.delete(arg).await {
                Ok(true) => println!("[DELETED] {arg}"),
                Ok(false) => println!("[ERROR] No saved creature with id {arg}"),
                Err(e) => println!("[ERROR] {e}"),
            },
            "key" => {
                let credentials = config.credentials();
                let stored = match arg {
                    "" => {
                        println!("[ERROR] Usage: #key <key>|clear");
                        continue;
                    }
                    "clear" => credentials.clear().await,
                    key => credentials.set(key).await,
                };
                if let Err(e) = stored {
                    println!("[ERROR] {e}");
                    continue;
                }

                // The client is rebuilt with the new credential.
                config = config.with_style(lab.style().id);
                match CreatureLab::open(&config).await {
                    Ok(reopened) => {
                        lab = reopened;
                        println!("[KEY] Credentials updated");
                    }
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            "status" => print_status(&lab, custom_name.as_deref()),
            _ => println!("[ERROR] Unknown command. Type #help for help."),
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn report_cycle(
    lab: &CreatureLab<GeminiGenerator>,
    layout: Layout,
    result: Result<creature_core::HistoryRecord, LabError>,
) {
    match result {
        Ok(saved) => {
            println!("[SAVED] {} ({})", saved.data.name, saved.id);
            print_current(lab, layout);
        }
        Err(e) => {
            println!("[ERROR] {e}");
            if lab.has_pending_image() {
                println!("  The profile was kept. Use #retry-image to draw it again.");
                print_current(lab, layout);
            }
        }
    }
}

fn print_current(lab: &CreatureLab<GeminiGenerator>, layout: Layout) {
    if let Some(current) = lab.current() {
        let lineage = lab.lineage();
        print!(
            "{}",
            render::render_card(layout, current, lab.current_image(), lineage.as_ref())
        );
        println!();
    }
}

fn print_status(lab: &CreatureLab<GeminiGenerator>, custom_name: Option<&str>) {
    let style: &ArtStyle = lab.style();
    println!("[STATUS]");
    println!("  State: {:?}", lab.status());
    println!("  Style: {} ({})", style.label, style.id);
    println!("  Current: {}", lab.current().map_or("-", |c| c.name.as_str()));
    println!("  Name override: {}", custom_name.unwrap_or("-"));
    println!("  Gallery: {} creature(s)", lab.history().len());
    if lab.has_pending_image() {
        println!("  Image pending: use #retry-image");
    }
    if let Some(error) = lab.last_error() {
        println!("  Last error: {error}");
    }
}

fn print_help() {
    println!("[HELP]");
    for (usage, description) in HELP {
        println!("  {usage:<18} - {description}");
    }
}

fn clear_indicator(stdout: &mut io::Stdout) {
    print!("\r            \r");
    stdout.flush().ok();
}
