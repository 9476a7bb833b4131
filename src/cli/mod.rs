//! Command-line shell over the controllers.
//!
//! Stateless: every command restores the session, asks the policy guard,
//! mounts the controller it needs and prints what the controller holds.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    auth::{decide, Capability, Decision, RedirectTarget},
    errors::AppError,
    models::{AccountRole, RegisterRequest, UserId},
    services::{FileCollectionController, UploadFile},
    utils::file::format_bytes,
    Client,
};

#[derive(Parser, Debug)]
#[command(name = "my-cloud")]
#[command(author, version, about = "My Cloud file storage client", long_about = None)]
pub struct Cli {
    /// Server API URL (default: value of API_BASE_URL)
    #[arg(long, env = "API_BASE_URL")]
    pub api_url: Option<String>,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        username: String,
        /// Password (can also be set via MY_CLOUD_PASSWORD env var)
        #[arg(long, env = "MY_CLOUD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the session
    Logout,

    /// Create a new account
    Register(RegisterArgs),

    /// Show who is signed in
    Whoami,

    /// File storage commands
    #[command(subcommand)]
    Files(FilesCommands),

    /// Account administration commands (admin only)
    #[command(subcommand)]
    Users(UsersCommands),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub full_name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "MY_CLOUD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommands {
    /// List stored files
    List {
        /// Storage owner (defaults to the signed-in user)
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Upload a file
    Upload {
        path: PathBuf,
        #[arg(short, long, default_value = "")]
        comment: String,
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Rename a stored file
    Rename {
        id: u64,
        name: String,
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Delete a stored file
    Delete {
        id: u64,
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Download a stored file
    Download {
        id: u64,
        /// Target directory (default: value of DOWNLOAD_DIR)
        #[arg(short, long)]
        dest: Option<PathBuf>,
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Create a share link for a stored file
    Link {
        id: u64,
        #[arg(long)]
        user: Option<UserId>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List all accounts
    List,
    /// Delete an account
    Delete { id: UserId },
    /// Change an account's role (user or admin)
    Role { id: UserId, role: AccountRole },
}

pub async fn run_command(cli: &Cli, client: &Client) -> Result<()> {
    let outcome = match &cli.command {
        Commands::Login { username, password } => cmd_login(client, username, password).await,
        Commands::Logout => {
            client.session.logout().await;
            println!("Signed out.");
            Ok(())
        }
        Commands::Register(args) => cmd_register(client, args).await,
        Commands::Whoami => cmd_whoami(client),
        Commands::Files(command) => cmd_files(client, command).await,
        Commands::Users(command) => cmd_users(client, command).await,
    };

    if let Err(e) = &outcome {
        if e.downcast_ref::<AppError>().map_or(false, AppError::forces_sign_in) {
            bail!("{}. Run `my-cloud login` to continue.", e);
        }
    }
    outcome
}

async fn cmd_login(client: &Client, username: &str, password: &str) -> Result<()> {
    let outcome = client.session.login(username, password).await?;

    println!("Signed in as {} ({}).", username, outcome.role);
    match outcome.landing {
        RedirectTarget::AdminDirectory => println!("Next: `my-cloud users list`"),
        _ => println!("Next: `my-cloud files list`"),
    }
    Ok(())
}

async fn cmd_register(client: &Client, args: &RegisterArgs) -> Result<()> {
    let request = RegisterRequest {
        username: args.username.clone(),
        full_name: args.full_name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
    };

    client.session.register(&request).await?;
    println!("Registration successful. Sign in with `my-cloud login {}`.", args.username);
    Ok(())
}

fn cmd_whoami(client: &Client) -> Result<()> {
    let session = client.session.snapshot();
    if !session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    let id = session
        .user_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("User ID: {}", id);
    println!("Role:    {:?}", session.role());
    Ok(())
}

/// Runs the guard and turns a redirect into a user-facing error.
fn guard(client: &Client, capability: Capability) -> Result<()> {
    match decide(&client.session.snapshot(), capability) {
        Decision::Allow => Ok(()),
        Decision::RedirectTo(RedirectTarget::SignIn) => {
            bail!("Not signed in. Run `my-cloud login` first.")
        }
        Decision::RedirectTo(target) => bail!(
            "Admin privileges required; your storage is at {}",
            target.path()
        ),
    }
}

async fn mount_storage(client: &Client, user: Option<UserId>) -> Result<FileCollectionController> {
    let session = client.session.snapshot();
    if !session.is_authenticated() {
        guard(client, Capability::OwnStorage)?;
    }

    let owner = user
        .or(session.user_id())
        .context("Signed-in user id unknown; pass --user")?;
    guard(client, Capability::storage_of(&session, owner))?;

    let storage = client.file_collection();
    storage.load(owner).await?;
    Ok(storage)
}

async fn cmd_files(client: &Client, command: &FilesCommands) -> Result<()> {
    match command {
        FilesCommands::List { user } => {
            let storage = mount_storage(client, *user).await?;
            print_files(&storage);
        }
        FilesCommands::Upload { path, comment, user } => {
            let storage = mount_storage(client, *user).await?;
            let file = UploadFile::from_path(path).await?;
            storage.upload(Some(file), comment).await?;
            print_files(&storage);
        }
        FilesCommands::Rename { id, name, user } => {
            let storage = mount_storage(client, *user).await?;
            storage.rename(*id, name).await?;
            print_files(&storage);
        }
        FilesCommands::Delete { id, user } => {
            let storage = mount_storage(client, *user).await?;
            storage.delete(*id).await?;
            println!("Deleted file {}.", id);
        }
        FilesCommands::Download { id, dest, user } => {
            let storage = mount_storage(client, *user).await?;
            let dest = dest.clone().unwrap_or_else(|| client.config.download_dir.clone());
            let downloaded = storage.request_download(*id, &dest).await?;
            println!(
                "Saved {} ({}) to {}",
                downloaded.file_name,
                format_bytes(downloaded.size_bytes),
                downloaded.path.display()
            );
        }
        FilesCommands::Link { id, user } => {
            let storage = mount_storage(client, *user).await?;
            let link = storage.request_share_link(*id).await?;
            println!("{}", link);
        }
    }
    Ok(())
}

async fn cmd_users(client: &Client, command: &UsersCommands) -> Result<()> {
    guard(client, Capability::AdminDirectory)?;

    let directory = client.user_directory();
    match command {
        UsersCommands::List => directory.load().await?,
        UsersCommands::Delete { id } => {
            directory.load().await?;
            directory.remove(*id).await?;
        }
        UsersCommands::Role { id, role } => {
            directory.load().await?;
            directory.change_role(*id, *role).await?;
        }
    }

    let users = directory.users();
    if users.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<6}  {:<20}  {:<24}  {:<28}  {:<6}  {:>6}  {:>10}",
        "ID", "USERNAME", "FULL NAME", "EMAIL", "ROLE", "FILES", "USAGE"
    );
    println!("{}", "-".repeat(112));
    for user in users {
        println!(
            "{:<6}  {:<20}  {:<24}  {:<28}  {:<6}  {:>6}  {:>10}",
            user.id,
            truncate(&user.username, 20),
            truncate(&user.full_name, 24),
            truncate(&user.email, 28),
            user.role,
            user.file_count,
            format_bytes(user.storage_usage_bytes)
        );
    }
    println!();
    Ok(())
}

fn print_files(storage: &FileCollectionController) {
    let files = storage.files();
    if files.is_empty() {
        println!("No uploaded files.");
        return;
    }

    println!();
    println!(
        "{:<6}  {:<30}  {:<24}  {:>10}  {:<16}  {:<16}",
        "ID", "NAME", "COMMENT", "SIZE", "UPLOADED", "LAST DOWNLOAD"
    );
    println!("{}", "-".repeat(112));
    for file in &files {
        let last_download = file
            .last_downloaded_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6}  {:<30}  {:<24}  {:>10}  {:<16}  {:<16}",
            file.id,
            truncate(&file.display_name, 30),
            truncate(&file.comment, 24),
            format_bytes(file.size_bytes),
            file.uploaded_at.format("%Y-%m-%d %H:%M"),
            last_download
        );
    }
    println!();
    println!(
        "{} files, {} total",
        files.len(),
        format_bytes(storage.total_size_bytes())
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
