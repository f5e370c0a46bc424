//! Command dispatch and job orchestration.
//!
//! Every purchase job runs as a detached task whose only synchronization with
//! the foreground is the progress sink and its cancellation token; Ctrl+C
//! cancels the token and the loop winds down at its next checkpoint. A job
//! may briefly outlive the prompt that spawned it; an in-flight request
//! always completes.

use crate::auth::{CredentialStore, SessionManager};
use crate::catalog::{Catalog, ItemCategory};
use crate::cli::{Cli, Commands, FarmKind, WeaponCommands};
use crate::config::Config;
use crate::error::PurchaseError;
use crate::http;
use crate::purchase::{
    ConsoleSink, ContinuousLoop, FarmTarget, JobSummary, PurchaseExecutor,
};
use crate::templates::RequestTemplates;
use crate::weapons::{self, WeaponService};
use anyhow::{Context, Result, anyhow};
use console::style;
use dialoguer::{Input, Password};
use std::future::Future;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Login {
            username,
            remember,
            forget,
        } => {
            if forget {
                CredentialStore::new(config.credentials_path()).clear()?;
                println!("Forgot remembered credentials.");
                return Ok(());
            }
            let username = match username {
                Some(u) => u,
                None => Input::new().with_prompt("Username").interact_text()?,
            };
            let password = Password::new().with_prompt("Password").interact()?;
            run_login(&config, &username, &password, remember).await
        }
        Commands::Buy {
            category,
            item,
            count,
        } => {
            let summary = run_buy(&config, parse_category(&category)?, &item, count).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::BuyAll { category, times } => {
            let summary = run_buy_all(&config, parse_category(&category)?, times).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Farm { target } => {
            let summary = run_farm(&config, target).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Weapons { weapon_command } => match weapon_command {
            WeaponCommands::Update => run_weapons_update(&config).await,
            WeaponCommands::LevelUp { stat_code, inc } => {
                run_level_up(&config, &stat_code, inc).await
            }
        },
        Commands::Menu => crate::menu::run(&config).await,
    }
}

pub(crate) fn parse_category(input: &str) -> Result<ItemCategory> {
    input.parse().map_err(|_| {
        let known = ItemCategory::iter()
            .map(ItemCategory::key)
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("Unknown category '{input}'. Use one of: {known}")
    })
}

pub(crate) async fn run_login(
    config: &Config,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<()> {
    let manager = session_manager(config);
    let session = manager
        .login(username, password)
        .await
        .context("Login failed")?;

    let store = CredentialStore::new(config.credentials_path());
    if remember {
        store.save(username, password)?;
    } else {
        store.clear()?;
    }

    println!("{}", style("Login successful!").green());
    println!("User ID: {}", session.user_id);
    Ok(())
}

pub(crate) async fn run_buy(
    config: &Config,
    category: ItemCategory,
    item_name: &str,
    count: u32,
) -> Result<JobSummary> {
    let catalog = Catalog::load(&config.catalog_path())?;
    let item = catalog
        .find(category, item_name)
        .ok_or_else(|| PurchaseError::UnknownItem(item_name.to_string(), category.key()))?
        .clone();
    let templates = RequestTemplates::load(&config.templates_path())?;
    let executor = PurchaseExecutor::from_templates(http::build_client(), &templates)?;

    println!("Starting individual purchase... Press Ctrl+C to stop.");
    run_cancellable(move |cancel| async move {
        executor.run_finite(&item, count, &ConsoleSink, &cancel).await
    })
    .await
}

pub(crate) async fn run_buy_all(
    config: &Config,
    category: ItemCategory,
    times: u32,
) -> Result<JobSummary> {
    let catalog = Catalog::load(&config.catalog_path())?;
    let items = catalog.items(category).to_vec();
    if items.is_empty() {
        anyhow::bail!("Category '{}' has no items in the catalog", category.key());
    }
    let templates = RequestTemplates::load(&config.templates_path())?;
    let executor = PurchaseExecutor::from_templates(http::build_client(), &templates)?;

    println!("Starting bulk purchase... Press Ctrl+C to stop.");
    run_cancellable(move |cancel| async move {
        executor.run_bulk(&items, times, &ConsoleSink, &cancel).await
    })
    .await
}

pub(crate) async fn run_farm(config: &Config, kind: FarmKind) -> Result<JobSummary> {
    let templates = RequestTemplates::load(&config.templates_path())?;
    let target = match kind {
        FarmKind::Money => FarmTarget::money(&templates)?,
        FarmKind::Cstacks => FarmTarget::cstacks(&templates)?,
    };
    println!(
        "Starting continuous {} purchase... Press Ctrl+C to stop.",
        target.label
    );
    let mut farm = ContinuousLoop::new(
        http::build_client(),
        target,
        &templates,
        session_manager(config),
        CredentialStore::new(config.credentials_path()),
    )?;

    run_cancellable(move |cancel| async move { farm.run(&ConsoleSink, &cancel).await }).await
}

pub(crate) async fn run_weapons_update(config: &Config) -> Result<()> {
    let templates = RequestTemplates::load(&config.templates_path())?;
    let service = WeaponService::from_templates(http::build_client(), &templates)?;
    let stats = service.fetch_stats().await?;
    weapons::save_cache(&stats, &config.weapons_path())?;
    println!("Cached {} weapon-level stats.", stats.len());
    Ok(())
}

pub(crate) async fn run_level_up(config: &Config, stat_code: &str, inc: u32) -> Result<()> {
    let cached = weapons::load_cache(&config.weapons_path());
    let current = cached
        .iter()
        .find(|stat| stat.stat_code == stat_code)
        .map(|stat| stat.level)
        .ok_or_else(|| {
            anyhow!("Unknown stat '{stat_code}'. Run `nebulafarm weapons update` first")
        })?;

    let templates = RequestTemplates::load(&config.templates_path())?;
    let service = WeaponService::from_templates(http::build_client(), &templates)?;
    service.level_up(stat_code, current, inc).await?;

    println!("{}", style("Payload sent successfully.").green());
    Ok(())
}

fn session_manager(config: &Config) -> SessionManager {
    SessionManager::new(
        config.auth_url.clone(),
        config.templates_path(),
        http::build_client(),
    )
}

/// Spawn a purchase job as its own task and cancel it on Ctrl+C. The job owns
/// its cancellation token; no state is shared with other jobs.
async fn run_cancellable<F, Fut>(job: F) -> Result<JobSummary>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = JobSummary> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(job(cancel.clone()));

    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let summary = handle.await.context("purchase job panicked")?;
    watcher.abort();
    Ok(summary)
}

fn print_summary(summary: &JobSummary) {
    let line = format!(
        "Done: {} of {} attempts succeeded.",
        summary.succeeded, summary.attempted
    );
    if summary.cancelled {
        println!("{} {}", style(line).dim(), style("(stopped)").yellow());
    } else {
        println!("{}", style(line).dim());
    }
}
