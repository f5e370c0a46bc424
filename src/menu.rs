//! Interactive terminal menu, the stand-in for the original tool's window
//! layer. Each confirmed action hands off to the same job runners the plain
//! subcommands use; selections are resolved to concrete item values before a
//! job starts.

use crate::app;
use crate::catalog::{Catalog, ItemCategory};
use crate::cli::FarmKind;
use crate::config::Config;
use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use strum::IntoEnumIterator;

pub async fn run(config: &Config) -> Result<()> {
    println!("{}", style("nebulafarm").white().bold());

    loop {
        let actions = [
            "Buy an item",
            "Buy a full category",
            "Farm money",
            "Farm C-Stacks",
            "Update weapon stats",
            "Level up a weapon",
            "Login",
            "Exit",
        ];
        let choice = Select::new()
            .with_prompt("Main Menu")
            .items(&actions)
            .default(0)
            .interact()?;

        let outcome = match choice {
            0 => buy_flow(config).await,
            1 => buy_all_flow(config).await,
            2 => farm_flow(config, FarmKind::Money).await,
            3 => farm_flow(config, FarmKind::Cstacks).await,
            4 => app::run_weapons_update(config).await,
            5 => level_up_flow(config).await,
            6 => login_flow(config).await,
            _ => break,
        };

        // A failed action returns to the menu instead of exiting.
        if let Err(e) = outcome {
            println!("{}", style(format!("Error: {e:#}")).red());
        }
    }

    Ok(())
}

fn select_category() -> Result<ItemCategory> {
    let categories: Vec<ItemCategory> = ItemCategory::iter().collect();
    let labels: Vec<String> = categories.iter().map(|c| c.key()).collect();
    let idx = Select::new()
        .with_prompt("Category")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(categories[idx])
}

async fn buy_flow(config: &Config) -> Result<()> {
    let category = select_category()?;
    let catalog = Catalog::load(&config.catalog_path())?;
    let items = catalog.items(category).to_vec();
    if items.is_empty() {
        anyhow::bail!("Category '{}' has no items in the catalog", category.key());
    }

    let labels: Vec<String> = items
        .iter()
        .map(|item| format!("{} ({} {})", item.name, item.price, item.currency))
        .collect();
    let idx = Select::new()
        .with_prompt("Item")
        .items(&labels)
        .default(0)
        .interact()?;
    let item = items[idx].clone();

    let count: u32 = Input::new()
        .with_prompt(format!("How many {} to buy", item.name))
        .default(1)
        .interact_text()?;

    if !confirm(&format!("Buy {} x{count}?", item.name))? {
        return Ok(());
    }

    let summary = app::run_buy(config, category, &item.name, count).await?;
    println!(
        "{}",
        style(format!(
            "Purchased {} of {} attempts.",
            summary.succeeded, summary.attempted
        ))
        .dim()
    );
    Ok(())
}

async fn buy_all_flow(config: &Config) -> Result<()> {
    let category = select_category()?;
    let times: u32 = Input::new()
        .with_prompt("How many times to buy the full category")
        .default(1)
        .interact_text()?;

    if !confirm(&format!("Buy all of '{}' x{times}?", category.key()))? {
        return Ok(());
    }

    let summary = app::run_buy_all(config, category, times).await?;
    println!(
        "{}",
        style(format!(
            "Purchased {} of {} attempts.",
            summary.succeeded, summary.attempted
        ))
        .dim()
    );
    Ok(())
}

async fn farm_flow(config: &Config, kind: FarmKind) -> Result<()> {
    if !confirm("Start the continuous purchase loop?")? {
        return Ok(());
    }
    app::run_farm(config, kind).await?;
    Ok(())
}

async fn level_up_flow(config: &Config) -> Result<()> {
    let cached = crate::weapons::load_cache(&config.weapons_path());
    if cached.is_empty() {
        anyhow::bail!("No cached weapon stats. Pick 'Update weapon stats' first");
    }

    let labels: Vec<String> = cached
        .iter()
        .map(|stat| format!("{} (level {})", stat.stat_code, stat.level))
        .collect();
    let idx = Select::new()
        .with_prompt("Weapon")
        .items(&labels)
        .default(0)
        .interact()?;

    let inc: u32 = Input::new()
        .with_prompt("Levels to add")
        .default(1)
        .interact_text()?;

    app::run_level_up(config, &cached[idx].stat_code, inc).await
}

async fn login_flow(config: &Config) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;
    let remember = Confirm::new()
        .with_prompt("Remember me?")
        .default(false)
        .interact()?;
    app::run_login(config, &username, &password, remember).await
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(true).interact()?)
}
