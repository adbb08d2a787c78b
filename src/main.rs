use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use leadfeed::config::Config;
use leadfeed::feed::{
    present_if_ready, ArchiveFilters, Category, ContentItem, ContextResolver, EntityId,
    FeedContext, FeedController, FeedView, FetchOutcome, Presenter,
};
use leadfeed::gateway::HttpGateway;
use leadfeed::util::{display_width, single_line, truncate_to_width};
use std::path::PathBuf;

/// Exit status for a category or subcategory that does not exist.
const EXIT_NOT_FOUND: i32 = 2;

/// Get the config directory path (~/.config/leadfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("leadfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "leadfeed", about = "Print category, subcategory and archive feeds from a news content API")]
struct Args {
    /// Config file (default: ~/.config/leadfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Content API base URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Additional pages to load after the first
    #[arg(long, default_value_t = 0)]
    pages: usize,

    /// Maximum line width in terminal columns
    #[arg(long, default_value_t = 100)]
    width: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lead items and pages of one category
    Category {
        /// Category slug (or id with --by-id)
        slug: String,

        /// Treat SLUG as a category id and skip the slug lookup
        #[arg(long)]
        by_id: bool,
    },
    /// Lead items and pages of one subcategory
    Subcategory { category: String, subcategory: String },
    /// Filtered archive
    Archive {
        /// First day to include
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,

        /// Last day to include (the whole day)
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,

        /// Category id to restrict to
        #[arg(long, value_name = "ID")]
        category: Option<EntityId>,

        /// Print the category filter options instead of the archive
        #[arg(long)]
        list_categories: bool,
    },
}

/// Prints the feed heading and everything loaded so far.
struct ConsolePresenter {
    width: usize,
}

impl Presenter for ConsolePresenter {
    fn context_ready(&mut self, view: &FeedView<'_>) {
        let title = single_line(view.title().unwrap_or("Feed"));
        println!("{}", truncate_to_width(&title, self.width));
        println!("{}", "=".repeat(display_width(&title).min(self.width)));
        for item in view.state.items() {
            print_item(item, self.width);
        }
    }
}

fn print_item(item: &ContentItem, width: usize) {
    let heading = if item.heading.trim().is_empty() {
        single_line(&item.slug)
    } else {
        single_line(&item.heading)
    };
    let line = format!("{:>8}  {}", item.id, heading);
    println!("{}", truncate_to_width(&line, width));
}

fn print_categories(categories: &[Category], depth: usize, width: usize) {
    for category in categories {
        let line = format!(
            "{}{:>6}  {}",
            "  ".repeat(depth),
            category.id,
            single_line(&category.name)
        );
        println!("{}", truncate_to_width(&line, width));
        print_categories(&category.subcategories, depth + 1, width);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with the printed feed
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if config.base_url.trim().is_empty() {
        anyhow::bail!(
            "No content API configured: pass --base-url or set base_url in {}",
            config_path.display()
        );
    }
    tracing::debug!(config = ?config, "Effective configuration");

    let gateway = HttpGateway::from_config(&config).context("Invalid content API settings")?;

    let (context, filters) = match args.command {
        Command::Category { slug, by_id: true } => {
            (FeedContext::category_id(slug.parse::<EntityId>()?), None)
        }
        Command::Category { slug, by_id: false } => (FeedContext::category_slug(slug), None),
        Command::Subcategory {
            category,
            subcategory,
        } => (FeedContext::subcategory(category, subcategory), None),
        Command::Archive {
            list_categories: true,
            ..
        } => {
            let categories = ContextResolver::new(&gateway, &config.endpoints)
                .archive_categories()
                .await
                .context("Failed to load archive categories")?;
            print_categories(&categories, 0, args.width);
            return Ok(());
        }
        Command::Archive {
            from, to, category, ..
        } => {
            let filters = ArchiveFilters {
                start_date: from,
                end_date: to,
                category_id: category,
            };
            (FeedContext::Archive, Some(filters))
        }
    };

    let mut feed = FeedController::from_config(gateway, &config);

    let outcome = feed
        .initialize(context.clone(), filters)
        .await
        .with_context(|| format!("Failed to load {}", context))?;
    if outcome == FetchOutcome::NotFound {
        eprintln!("Not found: {}", context);
        std::process::exit(EXIT_NOT_FOUND);
    }

    let mut presenter = ConsolePresenter { width: args.width };
    present_if_ready(&feed, &mut presenter);

    let mut printed = feed.state().items().count();
    for _ in 0..args.pages {
        if !feed.state().has_more() {
            break;
        }
        feed.load_more()
            .await
            .with_context(|| format!("Failed to load more of {}", context))?;
        for item in feed.state().items().skip(printed) {
            print_item(item, args.width);
        }
        printed = feed.state().items().count();
    }

    if !feed.state().has_more() {
        println!("(end of feed)");
    }

    Ok(())
}
