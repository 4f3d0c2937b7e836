use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use auth_client::{config::load_settings, form::FormPhase, AuthClient, Router};
use clap::{Parser, Subcommand};
use shared::domain::Role;
use storage::SessionStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "college-auth", about = "Sign in, register and manage the stored session")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        role: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Persist the remember-me preference alongside the session.
        #[arg(long)]
        remember: bool,
    },
    /// Register a new account from repeated --field name=value pairs.
    Register {
        #[arg(long)]
        role: String,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Optional profile image to attach.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show the currently stored identity.
    Whoami,
    /// Clear the stored session.
    Logout,
}

/// Router for a pageless host: navigations become log lines and stdout.
struct PrintingRouter;

impl Router for PrintingRouter {
    fn navigate(&self, path: &str) {
        println!("-> {path}");
    }
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("expected name=value, got '{raw}'")),
    }
}

fn parse_role(tag: &str) -> Result<Role> {
    Role::from_tag(&tag.to_lowercase())
        .with_context(|| format!("unknown role '{tag}', expected student, professor or hod"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let settings = load_settings();
    let sessions = Arc::new(SessionStore::new(&settings.database_url).await?);
    let client = AuthClient::new(settings, sessions)?.with_router(Arc::new(PrintingRouter));

    match cli.command {
        Command::Login {
            role,
            username,
            password,
            remember,
        } => {
            let role = parse_role(&role)?;
            let mut form = client.sign_in_form(role);
            form.update_field("username", &username);
            form.update_field("password", &password);
            form.set_remember(remember);
            form.submit().await;

            match form.phase() {
                FormPhase::Success => {
                    info!(role = role.as_str(), "login ok");
                    println!("Signed in as {username}");
                }
                _ => bail!("{}", form.error().unwrap_or("Login failed")),
            }
        }
        Command::Register { role, fields, image } => {
            let role = parse_role(&role)?;
            let mut form = client.registration_form(role);
            for (name, value) in &fields {
                form.update_field(name, value);
            }
            if let Some(path) = image {
                let bytes = fs::read(&path)
                    .with_context(|| format!("failed to read image {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload.png".to_string());
                form.attach_image(filename, bytes);
            }
            form.submit().await;

            match form.phase() {
                FormPhase::Success => {
                    println!("{}", form.notice().unwrap_or("Registered"));
                }
                _ => bail!("{}", form.error().unwrap_or("Registration failed")),
            }
        }
        Command::Whoami => match client.current_user().await? {
            Some(identity) => {
                println!(
                    "{} {} <{}> ({})",
                    identity.role.display_name(),
                    identity.display_name,
                    identity.email,
                    identity.id
                );
                println!("{}", serde_json::to_string_pretty(&identity.raw_profile)?);
            }
            None => println!("Not signed in"),
        },
        Command::Logout => {
            client.logout().await?;
            println!("Signed out");
        }
    }

    Ok(())
}
