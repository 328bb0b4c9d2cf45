use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_success, password_or_prompt};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server and print the access token")]
    Login {
        #[arg(help = "Username or email")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, env = "ESTATE_SERVER", default_value = "http://localhost:5174", help = "Server base URL")]
        server: String,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login {
            username,
            password,
            server,
        } => {
            let password = password_or_prompt(password)?;
            let url = format!("{}/api/login", server.trim_end_matches('/'));

            let response = reqwest::Client::new()
                .post(&url)
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await
                .with_context(|| format!("failed to reach {}", url))?;

            let status = response.status();
            let body: Value = response.json().await.context("server returned a non-JSON response")?;

            if !status.is_success() {
                let message = body["message"].as_str().unwrap_or("Login failed");
                output_error(&output_format, message, body["code"].as_str())?;
                anyhow::bail!("login failed with status {}", status);
            }

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Login successful",
                    Some(json!({ "user": body["user"], "token": body["token"] })),
                ),
                OutputFormat::Text => {
                    let role = body["user"]["role"].as_str().unwrap_or("user");
                    println!("✓ Logged in as {} ({})", username, role);
                    println!("{}", body["token"].as_str().unwrap_or_default());
                    Ok(())
                }
            }
        }
    }
}
