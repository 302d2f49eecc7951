use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use faculty_backend::config::AppConfig;
use faculty_backend::db;
use faculty_backend::services::{DemoSeeder, SeedOptions};

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

/// Value following `flag`, e.g. `--teachers 5`.
fn flag_value(flag: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            let raw = args
                .get(i + 1)
                .ok_or_else(|| format!("{} needs a number", flag))?;
            Ok(Some(raw.parse().map_err(|_| format!("{} needs a number, got {}", flag, raw))?))
        }
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "faculty_backend=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = SeedOptions::default();
    let options = SeedOptions {
        teachers: flag_value("--teachers")?.unwrap_or(defaults.teachers),
        sessions_per_teacher: flag_value("--per-teacher")?.unwrap_or(defaults.sessions_per_teacher),
        clear: has_flag("--clear"),
        ..defaults
    };

    let dry_run = is_dry_run();
    let config = AppConfig::from_env()?;

    let pool = if dry_run {
        println!(
            "[DRY RUN] Seeding a scratch in-memory database; {} is left untouched. Pass --apply to write.",
            config.database_url
        );
        db::connect_in_memory().await?
    } else {
        db::connect(&config).await?
    };

    let stats = DemoSeeder::run(pool, &options).await?;

    let prefix = if dry_run { "[DRY RUN] Would create" } else { "Created" };
    println!(
        "{} {} departments, {} classrooms, {} programs, {} subjects",
        prefix, stats.departments, stats.classrooms, stats.programs, stats.subjects
    );
    println!(
        "{} {} teachers with {} subject assignments",
        prefix, stats.teachers, stats.assignments
    );
    println!(
        "{} {} sessions ({} conflicting candidates skipped)",
        prefix, stats.created, stats.skipped
    );

    Ok(())
}
