use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, AuthMode, CatalogPage, ProductField, SubmitOutcome, Toast, ToastKind,
};
use shared::domain::ProductId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides `base_url` from catalog.toml and the environment.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register,
    #[command(flatten)]
    Catalog(CatalogCommand),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    List,
    Create {
        name: String,
        description: String,
        price: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let wait_budget = settings.request_timeout * 2;

    let page = CatalogPage::connect(&settings)?;
    let _orchestrator = page.start();

    let command = match cli.command {
        Command::Catalog(command) => command,
        Command::Register => {
            if page.auth.mode() == AuthMode::Login {
                page.auth.toggle_mode();
            }
            page.auth.set_username(&cli.username);
            page.auth.set_password(&cli.password);
            return match page.auth.submit().await {
                SubmitOutcome::Registered => {
                    let notice = page.auth.state().notice.unwrap_or_default();
                    println!("{notice}");
                    Ok(())
                }
                other => bail!("registration failed: {}", describe(&page, other)),
            };
        }
    };

    page.auth.set_username(&cli.username);
    page.auth.set_password(&cli.password);
    match page.auth.submit().await {
        SubmitOutcome::Authenticated(user) => {
            info!(user_id = %user.id, role = ?user.role, "logged in");
        }
        other => bail!("login failed: {}", describe(&page, other)),
    }

    let mut list = page.list.watch();
    tokio::time::timeout(wait_budget, list.wait_for(|state| state.renders >= 1))
        .await
        .map_err(|_| anyhow::anyhow!("catalog did not load: {}", last_toast(&page)))?
        .context("list widget dropped")?;

    let toasts_before = page.toasts.raised();
    let mutated = match command {
        CatalogCommand::List => false,
        CatalogCommand::Create {
            name,
            description,
            price,
        } => {
            page.list.set_create_field(ProductField::Name, &name);
            page.list
                .set_create_field(ProductField::Description, &description);
            page.list.set_create_field(ProductField::Price, &price);
            page.list.submit_create()?;
            true
        }
        CatalogCommand::Edit {
            id,
            name,
            description,
            price,
        } => {
            page.list.click_edit(&ProductId::new(id))?;
            let edits = [
                (ProductField::Name, name),
                (ProductField::Description, description),
                (ProductField::Price, price),
            ];
            for (field, value) in edits {
                if let Some(value) = value {
                    page.list.set_edit_field(field, &value)?;
                }
            }
            page.list.submit_edit()?;
            true
        }
        CatalogCommand::Delete { id } => {
            page.list.click_delete(&ProductId::new(id))?;
            true
        }
    };

    if mutated {
        // Every mutation path ends in exactly one toast.
        wait_for_toast(&page, toasts_before, wait_budget).await?;
    }

    print_rows(&page);
    let mut failed = false;
    for toast in page
        .toasts
        .history()
        .into_iter()
        .filter(|toast| toast.id > toasts_before)
    {
        failed |= toast.kind == ToastKind::Error;
        print_toast(&toast);
    }

    if page.session.is_active() {
        if let Err(err) = page.auth.logout().await {
            warn!("logout failed: {err}");
        }
    }

    if failed {
        bail!("catalog operation failed");
    }
    Ok(())
}

async fn wait_for_toast(page: &CatalogPage, seen: u64, budget: Duration) -> Result<()> {
    let mut toasts = page.toasts.watch();
    tokio::time::timeout(budget, toasts.wait_for(|board| board.raised() > seen))
        .await
        .context("no response from the catalog")?
        .context("toast sink dropped")?;
    Ok(())
}

fn describe(page: &CatalogPage, outcome: SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Failed(message) => message,
        SubmitOutcome::Ignored => "a submission is already in flight".to_string(),
        _ => page
            .auth
            .state()
            .error
            .unwrap_or_else(|| "unexpected outcome".to_string()),
    }
}

fn last_toast(page: &CatalogPage) -> String {
    page.toasts
        .history()
        .pop()
        .map(|toast| toast.message)
        .unwrap_or_else(|| "no response".to_string())
}

fn print_rows(page: &CatalogPage) {
    let rows = page.list.rows();
    if rows.is_empty() {
        println!("(no products)");
        return;
    }
    for row in rows {
        println!(
            "{:>6}  {:<24} {:>10}  {}",
            row.id, row.name, row.price, row.description
        );
    }
}

fn print_toast(toast: &Toast) {
    let label = match toast.kind {
        ToastKind::Success => "ok",
        ToastKind::Warning => "warning",
        ToastKind::Error => "error",
    };
    println!("[{label}] {}", toast.message);
}
