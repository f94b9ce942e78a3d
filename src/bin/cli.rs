use std::collections::HashSet;
use std::str::FromStr;

use adboard::{seed, AuthConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::migrate::{Migrate, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Same migration set the server applies at startup.
static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Parser, Debug)]
#[command(author, version, about = "adboard admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// List migrations and whether each is applied
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Create the default role and its rights; fails if any of them already exist
    Seed {
        /// Let the seeded read rights cover every user's resources
        #[arg(long)]
        public_read: bool,
    },
    /// Give an existing user the admin role
    GrantAdmin { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fall back to the crate-local `.env` when the working directory has none.
    if dotenvy::dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = connect().await?;

    match cli.command {
        Commands::MigrateRun => {
            MIGRATOR.run(&pool).await.context("migration failed")?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let applied = applied_versions(&pool).await?;
            for line in status_lines(&MIGRATOR, &applied) {
                println!("{line}");
            }
        }
        Commands::MigrateRollback => {
            let applied = applied_versions(&pool).await?;
            let Some(last) = applied.iter().max().copied() else {
                anyhow::bail!("no applied migrations to roll back");
            };
            let reversible = MIGRATOR
                .iter()
                .any(|migration| migration.version == last && migration.migration_type.is_down_migration());
            if !reversible {
                anyhow::bail!("migration {last} has no down script");
            }
            MIGRATOR
                .undo(&pool, last - 1)
                .await
                .with_context(|| format!("rollback of {last} failed"))?;
            println!("Rolled back migration {last}");
        }
        Commands::Seed { public_read } => {
            let mut config = AuthConfig::from_env()?;
            if public_read {
                config = config.with_seed_read_only_own(false);
            }
            let seeded = seed::seed_default_role(&pool, &config)
                .await
                .context("seeding the default role failed")?;
            println!("Seeded role '{}' (id {})", seeded.role.name, seeded.role.id);
            for right in seeded.rights {
                println!(
                    "  right {:<4} model={:<14} read={:<5} write={:<5} only_own={}",
                    right.id, right.model, right.read, right.write, right.only_own
                );
            }
        }
        Commands::GrantAdmin { name } => {
            let role = seed::grant_admin(&pool, &name).await?;
            println!("Assigned role '{}' to {}", role.name, name);
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<HashSet<i64>> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;
    let applied = conn.list_applied_migrations().await?;
    Ok(applied.into_iter().map(|migration| migration.version).collect())
}

fn status_lines(migrator: &Migrator, applied: &HashSet<i64>) -> Vec<String> {
    migrator
        .iter()
        .filter(|migration| migration.migration_type.is_up_migration())
        .map(|migration| {
            let state = if applied.contains(&migration.version) {
                "applied"
            } else {
                "pending"
            };
            format!("{:<8} {} {}", state, migration.version, migration.description)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_marks_applied_versions() {
        let first = MIGRATOR.iter().next().unwrap().version;

        let pending = status_lines(&MIGRATOR, &HashSet::new());
        assert!(!pending.is_empty());
        assert!(pending.iter().all(|line| line.starts_with("pending")));

        let applied = status_lines(&MIGRATOR, &HashSet::from([first]));
        assert!(applied[0].starts_with("applied"));
        assert!(applied[0].contains(&first.to_string()));
    }
}
