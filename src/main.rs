//! Leasehold console
//!
//! Interactive front end over the dashboard API: pick a scope, load any
//! resource through the shared cache and watch invalidation happen.

use anyhow::Result;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

use leasehold::api::{ApiClient, Mutation, Transport};
use leasehold::config::AppConfig;
use leasehold::event_bus::ConsoleEvent;
use leasehold::presentation::timezone::{format_utc_offset, format_with_offset};
use leasehold::presentation::PaletteSeeds;
use leasehold::query::LocalFilters;
use leasehold::selection::FileStorage;
use leasehold::session::{affected_resources, ConsoleSession};
use leasehold::telemetry;
use leasehold::undo::DEFAULT_UNDO_WINDOW;

const HELP: &str = "\
  agent <id|all>            landlord <id|all>        property <id|all>
  clear                     show                     reconcile
  get <resource> [k=v ...]  reload <resource> [k=v ...]
  invalidate [resource]     properties               landlords
  post|put <path> <json>    delete <path> [label]    undo <path>
  tz                        help                     quit";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    let _log_guard = telemetry::init_logging(config.log_dir.as_deref())?;

    println!("\n{}", "═".repeat(60));
    println!("🏠 Leasehold console v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "═".repeat(60));
    println!("API: {} | Role: {}", config.api_url, config.role);
    println!("{}\n", "═".repeat(60));

    let storage = Arc::new(FileStorage::open(&config.state_file)?);
    let transport: Arc<dyn Transport> = Arc::new(ApiClient::new(
        config.api_url.clone(),
        config.token.clone(),
        config.timeout,
    ));
    let mut session = ConsoleSession::new(storage, config.role, transport);
    println!("💾 Selection restored from '{}': {}", config.state_file.display(), session.selection());

    let mut events = session.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ConsoleEvent::DeleteScheduled { label, .. } => {
                    println!("\n🗑️  {} will be deleted in {}s ('undo' to keep it)", label, DEFAULT_UNDO_WINDOW.as_secs())
                }
                ConsoleEvent::DeleteUndone { label, .. } => println!("\n↩️  {} kept", label),
                ConsoleEvent::DeleteExecuted { key } => println!("\n✅ Deleted {}", key),
                other => info!(?other, "console event"),
            }
        }
    });

    let seeds = PaletteSeeds::new();
    println!("\n💡 Commands ('help' for the full list): get | landlord | property | reconcile | quit\n");

    loop {
        print!("📋 > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let mut words = input.split_whitespace();
        let Some(command) = words.next().map(str::to_lowercase) else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let outcome = match command.as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "show" => {
                println!("📍 {}", session.selection());
                Ok(())
            }
            "agent" => session.set_agent(args.first().copied().filter(|a| *a != "all")),
            "landlord" => session.select_landlord(args.first().copied().unwrap_or("all")),
            "property" => session.select_property(args.first().copied().unwrap_or("all")),
            "clear" => session.clear_filters(),
            "reconcile" => match session.reconcile().await {
                Ok(changed) => {
                    println!("{} {}", if changed { "🔄" } else { "✔️ " }, session.selection());
                    Ok(())
                }
                Err(e) => Err(e),
            },
            "get" | "reload" => load(&session, command == "reload", &args).await,
            "invalidate" => {
                let count = session.invalidate(args.first().copied());
                println!("♻️  {} entries marked stale", count);
                Ok(())
            }
            "properties" => match session.properties().await {
                Ok(properties) => {
                    for p in properties {
                        println!("  {} {} (landlord {})", p.id, p.name, p.landlord_id.as_deref().unwrap_or("-"));
                    }
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            "landlords" => match session.landlords().await {
                Ok(landlords) => {
                    for l in landlords {
                        println!("  [{}] {} {}", seeds.palette("landlord-cards", &l.id).name, l.id, l.username);
                    }
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            "post" | "put" => mutate(&session, &command, &args).await,
            "delete" => match args.first() {
                Some(path) => {
                    let label = if args.len() > 1 { args[1..].join(" ") } else { path.to_string() };
                    let resources = affected_resources(path);
                    let resources: Vec<&str> = resources.iter().map(String::as_str).collect();
                    session.schedule_delete(path, &label, DEFAULT_UNDO_WINDOW, &resources);
                    Ok(())
                }
                None => Err(anyhow::anyhow!("Usage: delete <path> [label]")),
            },
            "undo" => {
                match args.first() {
                    Some(path) if session.undo_delete(path) => {}
                    _ => println!("Nothing to undo"),
                }
                Ok(())
            }
            "tz" => {
                let offset = session.timezone_offset_minutes().await;
                let now = chrono::Utc::now().to_rfc3339();
                println!("🕒 {} (now {})", format_utc_offset(offset), format_with_offset(Some(&now), offset));
                Ok(())
            }
            other => {
                println!("Unknown command '{}'. Type 'help'.", other);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("❌ {:#}", e);
        }
    }

    Ok(())
}

async fn load(session: &ConsoleSession, force: bool, args: &[&str]) -> Result<()> {
    let Some((resource, pairs)) = args.split_first() else {
        anyhow::bail!("Usage: get <resource> [name=value ...]");
    };
    let filters = LocalFilters::from_pairs(pairs.iter().copied())?;
    println!("🔑 {}", session.key(resource, &filters));

    let result = if force {
        session.reload(resource, &filters).await
    } else {
        session.load(resource, &filters).await
    };

    if let Some(snapshot) = session.snapshot(resource, &filters) {
        println!(
            "   status={:?} stale={} fetching={}",
            snapshot.status, snapshot.stale, snapshot.is_fetching
        );
    }
    let data = result?;
    println!("{}", render(&data));
    Ok(())
}

async fn mutate(session: &ConsoleSession, command: &str, args: &[&str]) -> Result<()> {
    let Some((path, body)) = args.split_first() else {
        anyhow::bail!("Usage: {} <path> <json>", command);
    };
    let method: Mutation = command.parse()?;
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str::<Value>(&body.join(" "))?)
    };
    let resources = affected_resources(path);
    let resources: Vec<&str> = resources.iter().map(String::as_str).collect();
    let response = session.mutate(method, path, body, &resources).await?;
    println!("{}", render(&response));
    Ok(())
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
