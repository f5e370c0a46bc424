use clap::{Parser, Subcommand, ValueEnum};

/// `nebulafarm` - Automated storefront purchase runner.
#[derive(Parser, Debug)]
#[command(name = "nebulafarm")]
#[command(version = "0.1.0")]
#[command(about = "Automated storefront purchase runner for the Nebula commerce API.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and persist finalized request templates
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Remember the credentials for automatic re-login
        #[arg(long)]
        remember: bool,

        /// Forget any remembered credentials and exit
        #[arg(long, conflicts_with = "remember")]
        forget: bool,
    },

    /// Buy one catalog item a fixed number of times
    Buy {
        /// Catalog category, e.g. "Paint" or "Inventory Slots"
        category: String,

        /// Item display name, e.g. "Red Paint"
        item: String,

        /// How many purchases to issue
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },

    /// Buy every item of a category, the full traversal repeated
    BuyAll {
        /// Catalog category, e.g. "Paint" or "Inventory Slots"
        category: String,

        /// How many times to repeat the traversal
        #[arg(short, long, default_value_t = 1)]
        times: u32,
    },

    /// Run the continuous top-up loop until stopped
    Farm {
        /// Which balance to farm
        #[arg(value_enum, default_value_t = FarmKind::Money)]
        target: FarmKind,
    },

    /// Weapon stat tooling
    Weapons {
        #[command(subcommand)]
        weapon_command: WeaponCommands,
    },

    /// Interactive menu (category, item, quantity)
    Menu,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FarmKind {
    Money,
    Cstacks,
}

#[derive(Subcommand, Debug)]
pub enum WeaponCommands {
    /// Refresh the cached weapon levels from the backend
    Update,

    /// Increment a weapon's level stat
    LevelUp {
        /// Stat code, e.g. "weapon-level-car4"
        stat_code: String,

        /// Levels to add
        #[arg(short, long, default_value_t = 1)]
        inc: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }
}
