//! VidSync CLI - sign in to VidSync from the terminal.
//!
//! Keeps a session token between runs and restores it on startup, the same
//! way the web client does.

mod app;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidsync_core::auth::{guard, AuthStatus, GuardDecision, DEFAULT_LOGIN_ROUTE};
use vidsync_core::models::UserProfile;
use vidsync_core::validation::{FieldErrors, LoginForm, RegisterForm, SUBMIT_BLOCKED_MESSAGE};

use app::App;

#[derive(Parser)]
#[command(name = "vidsync", version, about = "Sign in to VidSync from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show whether a session is active
    Status,
    /// Sign in with email and password
    Login {
        #[arg(long, env = "VIDSYNC_EMAIL")]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, env = "VIDSYNC_EMAIL")]
        email: Option<String>,
    },
    /// Print the signed-in user's profile
    Whoami,
    /// End the current session
    Logout,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    info!("vidsync starting");

    let mut app = App::new()?;
    app.wait_for_session().await;

    let code = match cli.command {
        Command::Status => status(&app),
        Command::Login { email } => login(&mut app, email).await?,
        Command::Register { email } => register(&mut app, email).await?,
        Command::Whoami => whoami(&app).await,
        Command::Logout => {
            app.session.logout();
            println!("Signed out.");
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

fn status(app: &App) -> ExitCode {
    let state = app.session.snapshot();
    match state.status {
        AuthStatus::Checking => println!("Checking session..."),
        AuthStatus::Authenticated => {
            let email = state.user.as_ref().map(|u| u.email.as_str()).unwrap_or_default();
            println!("Signed in as {}", email);
        }
        AuthStatus::Unauthenticated => println!("Not signed in."),
    }
    ExitCode::SUCCESS
}

async fn login(app: &mut App, email: Option<String>) -> Result<ExitCode> {
    let email = match email.or_else(|| app.config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = password_from_env_or_prompt("Password: ")?;

    let form = LoginForm { email, password };
    let credentials = match form.submit() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(report_field_errors(&errors)),
    };

    match app.session.login(&credentials).await {
        Ok(user) => {
            app.remember_email(&credentials.email);
            println!("Signed in as {}", user.display_name());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn register(app: &mut App, email: Option<String>) -> Result<ExitCode> {
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = password_from_env_or_prompt("Password: ")?;
    let confirm_password = match std::env::var("VIDSYNC_PASSWORD") {
        Ok(_) => password.clone(),
        Err(_) => rpassword::prompt_password("Confirm password: ")?,
    };

    let form = RegisterForm {
        email,
        password,
        confirm_password,
    };
    let credentials = match form.submit() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(report_field_errors(&errors)),
    };

    match app.session.register(&credentials).await {
        Ok(user) => {
            app.remember_email(&credentials.email);
            println!("Account created. Signed in as {}", user.display_name());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn whoami(app: &App) -> ExitCode {
    match guard(&app.session.snapshot(), DEFAULT_LOGIN_ROUTE) {
        GuardDecision::Loading => {
            eprintln!("Session is still being checked. Try again.");
            ExitCode::FAILURE
        }
        GuardDecision::Redirect(_) => {
            eprintln!("Not signed in. Run `vidsync login` first.");
            ExitCode::FAILURE
        }
        GuardDecision::Render => match app.session.refresh_user().await {
            Ok(user) => {
                print_profile(&user);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e.user_message());
                ExitCode::FAILURE
            }
        },
    }
}

fn print_profile(user: &UserProfile) {
    println!("id:       {}", user.id);
    println!("email:    {}", user.email);
    if let Some(ref nickname) = user.nickname {
        println!("nickname: {}", nickname);
    }
    if let Some(created) = user.created_at {
        println!("joined:   {}", created.format("%Y-%m-%d"));
    }
}

fn report_field_errors(errors: &FieldErrors) -> ExitCode {
    for (field, message) in errors.messages() {
        eprintln!("{}: {}", field, message);
    }
    eprintln!("{}", SUBMIT_BLOCKED_MESSAGE);
    ExitCode::FAILURE
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn password_from_env_or_prompt(prompt: &str) -> Result<String> {
    match std::env::var("VIDSYNC_PASSWORD") {
        Ok(password) => Ok(password),
        Err(_) => rpassword::prompt_password(prompt).context("Failed to read password"),
    }
}
