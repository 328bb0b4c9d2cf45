use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{database_manager, output_error, output_success, prompt};
use crate::cli::OutputFormat;
use crate::database::schema;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create tables and indexes, then insert sample data")]
    Setup {
        #[arg(long, help = "Skip the sample user and listings")]
        no_seed: bool,
    },

    #[command(about = "Drop and recreate all tables (destroys data)")]
    Reset {
        #[arg(long, help = "Do not ask for confirmation")]
        yes: bool,
    },
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let manager = database_manager()?;
    let pool = manager.pool().await?;

    match cmd {
        DbCommands::Setup { no_seed } => {
            schema::create_tables(&pool).await?;
            let report = if no_seed {
                schema::SeedReport::default()
            } else {
                schema::seed(&pool).await?
            };
            output_success(
                &output_format,
                &format!(
                    "Database ready ({} user(s), {} listing(s) seeded)",
                    report.users, report.listings
                ),
                Some(json!({ "seeded": { "users": report.users, "listings": report.listings } })),
            )
        }
        DbCommands::Reset { yes } => {
            if !yes {
                let answer = prompt(&format!(
                    "This drops every user and listing in {}. Type 'yes' to continue: ",
                    manager.redacted_url()
                ))?;
                if answer.trim() != "yes" {
                    return output_error(&output_format, "Reset cancelled", Some("CANCELLED"));
                }
            }
            schema::reset(&pool).await?;
            output_success(&output_format, "Database reset", None)
        }
    }
}
