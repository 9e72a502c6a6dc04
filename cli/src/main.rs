mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ListFilters, MenuInput, StallEdit, StallInput, cmd_area_add, cmd_area_list, cmd_menu_add,
    cmd_menu_list, cmd_menu_remove, cmd_menu_taste, cmd_progress, cmd_quest_complete,
    cmd_quest_list, cmd_quest_show, cmd_reset, cmd_review, cmd_seed, cmd_stall_add,
    cmd_stall_delete, cmd_stall_edit, cmd_stall_favorite, cmd_stall_import, cmd_stall_list,
    cmd_stall_show, cmd_stall_visit,
};
use crate::config::Config;
use makan_core::service::MakanService;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "MAKAN_LOG";

#[derive(Parser)]
#[command(
    name = "makan",
    version,
    about = "Find cheap food stalls, complete quests, climb the ranks"
)]
struct Cli {
    /// Database file (overrides MAKAN_DB and the default data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and visit food stalls
    Stall {
        #[command(subcommand)]
        command: StallCommands,
    },
    /// Manage a stall's menu
    Menu {
        #[command(subcommand)]
        command: MenuCommands,
    },
    /// Manage areas
    Area {
        #[command(subcommand)]
        command: AreaCommands,
    },
    /// Browse and claim quests
    Quest {
        #[command(subcommand)]
        command: QuestCommands,
    },
    /// Record a submitted review, optionally for a specific dish
    Review {
        /// Stall name or ID
        stall: String,
        /// Dish name or ID
        #[arg(long)]
        dish: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show rank, points and per-category progress
    Progress {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear all progress and milestone completion
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add the demo stalls and starter quests (skipped when already present)
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StallCommands {
    /// Add a stall
    Add {
        /// Stall name
        name: String,
        /// Cheapest item price (e.g. "8000" or "8k")
        #[arg(long)]
        min: String,
        /// Most expensive item price
        #[arg(long)]
        max: String,
        /// Average price (default: midpoint of min and max)
        #[arg(long)]
        avg: Option<String>,
        /// Area name or ID
        #[arg(long)]
        area: Option<String>,
        /// Short description
        #[arg(long)]
        description: Option<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stalls
    List {
        /// Only stalls in this area (name or ID)
        #[arg(long)]
        area: Option<String>,
        /// Average price range: 0-5k, 5-10k, 10-15k, 15-20k, 20k+
        #[arg(long)]
        price: Option<String>,
        /// Only stalls serving this cuisine
        #[arg(long)]
        cuisine: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only stalls with items under 10k
        #[arg(long)]
        budget: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a stall and its menu
    Show {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a stall
    Edit {
        /// Stall name or ID
        stall: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New minimum price
        #[arg(long)]
        min: Option<String>,
        /// New maximum price
        #[arg(long)]
        max: Option<String>,
        /// New average price
        #[arg(long)]
        avg: Option<String>,
        /// Move to this area (name or ID)
        #[arg(long)]
        area: Option<String>,
        /// Remove the area
        #[arg(long)]
        clear_area: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a stall and its menu
    Delete {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a stall to favorites
    Favorite {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a stall from favorites
    Unfavorite {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a visit to a stall
    Visit {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import stalls and menus from a CSV file
    Import {
        /// Path to the CSV file
        path: PathBuf,
        /// Preview without writing
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MenuCommands {
    /// Add a dish to a stall's menu
    Add {
        /// Stall name or ID
        stall: String,
        /// Dish name
        name: String,
        /// Price (e.g. "12000" or "12k")
        #[arg(long)]
        price: String,
        /// Cuisine: Indonesian, Western, Chinese, Japanese, Korean, Javanese, Sundanese
        #[arg(long, default_value = "Indonesian")]
        cuisine: String,
        /// Short description
        #[arg(long)]
        description: Option<String>,
        /// Tags, separated by ';' or ','
        #[arg(long)]
        tags: Option<String>,
        /// Diet type (e.g. "vegetarian")
        #[arg(long)]
        diet: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a stall's menu
    List {
        /// Stall name or ID
        stall: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a dish
    Remove {
        /// Stall name or ID
        stall: String,
        /// Dish name or ID
        dish: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record tasting a single dish
    Taste {
        /// Stall name or ID
        stall: String,
        /// Dish name or ID
        dish: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AreaCommands {
    /// Add an area
    Add {
        /// Area name
        name: String,
        /// Coordinates as "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        coords: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List areas
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum QuestCommands {
    /// Show the quest board with your rank
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a quest and its milestones
    Show {
        /// Quest title or ID
        quest: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Claim a quest's reward once its goal is reached
    Complete {
        /// Quest title or ID
        quest: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db.as_deref())?;
    debug!(path = %config.db_path.display(), "opening database");
    let mut service = MakanService::new(&config.db_path.to_string_lossy())?;
    let svc = &mut service;

    match cli.command {
        Commands::Stall { command } => match command {
            StallCommands::Add {
                name,
                min,
                max,
                avg,
                area,
                description,
                favorite,
                json,
            } => cmd_stall_add(
                svc,
                &StallInput {
                    name: &name,
                    min: &min,
                    max: &max,
                    avg: avg.as_deref(),
                    area: area.as_deref(),
                    description: description.as_deref(),
                    favorite,
                },
                json,
            ),
            StallCommands::List {
                area,
                price,
                cuisine,
                favorites,
                budget,
                json,
            } => cmd_stall_list(
                svc,
                &ListFilters {
                    area: area.as_deref(),
                    price: price.as_deref(),
                    cuisine: cuisine.as_deref(),
                    favorites,
                    budget,
                },
                json,
            ),
            StallCommands::Show { stall, json } => cmd_stall_show(svc, &stall, json),
            StallCommands::Edit {
                stall,
                name,
                description,
                min,
                max,
                avg,
                area,
                clear_area,
                json,
            } => cmd_stall_edit(
                svc,
                &stall,
                &StallEdit {
                    name: name.as_deref(),
                    description: description.as_deref(),
                    min: min.as_deref(),
                    max: max.as_deref(),
                    avg: avg.as_deref(),
                    area: area.as_deref(),
                    clear_area,
                },
                json,
            ),
            StallCommands::Delete { stall, json } => cmd_stall_delete(svc, &stall, json),
            StallCommands::Favorite { stall, json } => cmd_stall_favorite(svc, &stall, true, json),
            StallCommands::Unfavorite { stall, json } => {
                cmd_stall_favorite(svc, &stall, false, json)
            }
            StallCommands::Visit { stall, json } => cmd_stall_visit(svc, &stall, json),
            StallCommands::Import {
                path,
                dry_run,
                json,
            } => cmd_stall_import(svc, &path, dry_run, json),
        },
        Commands::Menu { command } => match command {
            MenuCommands::Add {
                stall,
                name,
                price,
                cuisine,
                description,
                tags,
                diet,
                json,
            } => cmd_menu_add(
                svc,
                &stall,
                &MenuInput {
                    name: &name,
                    price: &price,
                    cuisine: &cuisine,
                    description: description.as_deref(),
                    tags: tags.as_deref(),
                    diet: diet.as_deref(),
                },
                json,
            ),
            MenuCommands::List { stall, json } => cmd_menu_list(svc, &stall, json),
            MenuCommands::Remove { stall, dish, json } => cmd_menu_remove(svc, &stall, &dish, json),
            MenuCommands::Taste { stall, dish, json } => cmd_menu_taste(svc, &stall, &dish, json),
        },
        Commands::Area { command } => match command {
            AreaCommands::Add { name, coords, json } => {
                cmd_area_add(svc, &name, coords.as_deref(), json)
            }
            AreaCommands::List { json } => cmd_area_list(svc, json),
        },
        Commands::Quest { command } => match command {
            QuestCommands::List { json } => cmd_quest_list(svc, json),
            QuestCommands::Show { quest, json } => cmd_quest_show(svc, &quest, json),
            QuestCommands::Complete { quest, json } => cmd_quest_complete(svc, &quest, json),
        },
        Commands::Review { stall, dish, json } => cmd_review(svc, &stall, dish.as_deref(), json),
        Commands::Progress { json } => cmd_progress(svc, json),
        Commands::Reset { yes, json } => cmd_reset(svc, yes, json),
        Commands::Seed { json } => cmd_seed(svc, json),
    }
}
