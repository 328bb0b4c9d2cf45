use clap::Subcommand;
use serde_json::json;

use crate::auth::hash_password;
use crate::cli::utils::{database_manager, output_success, password_or_prompt};
use crate::cli::OutputFormat;
use crate::database::schema;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an admin account, or promote and re-password an existing one")]
    CreateAdmin {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Print a bcrypt hash for a password")]
    HashPassword {
        #[arg(help = "Password to hash")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::CreateAdmin {
            username,
            email,
            password,
        } => {
            let password = password_or_prompt(password)?;
            if password.chars().count() < 6 {
                anyhow::bail!("password must be at least 6 characters");
            }

            let manager = database_manager()?;
            let pool = manager.pool().await?;
            schema::create_tables(&pool).await?;
            let id = schema::upsert_admin(&pool, &username, &email, &password).await?;

            output_success(
                &output_format,
                &format!("Admin '{}' stored with id {}", username, id),
                Some(json!({ "id": id, "username": username, "email": email })),
            )
        }
        UserCommands::HashPassword { password } => {
            let hash = hash_password(&password)?;
            match output_format {
                OutputFormat::Json => output_success(&output_format, "Password hashed", Some(json!({ "hash": hash }))),
                OutputFormat::Text => {
                    println!("{}", hash);
                    Ok(())
                }
            }
        }
    }
}
