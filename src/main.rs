use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use scholarseva::{
    logging, AccountStore, AppConfig, AuthError, Catalog, FilterCriteria, Report, ReportFormat,
    ScholarshipId, ScholarshipRecord, SqliteStore, HOME_PREVIEW_LIMIT,
};

#[derive(Parser)]
#[command(name = "scholarseva", version, about = "Browse, filter and bookmark scholarships")]
struct Cli {
    /// Config file (defaults to ./scholarseva.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON file, overrides the config
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Account database, overrides the config
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long, default_value = "")]
    category: String,

    /// Annual family income in rupees
    #[arg(long, default_value = "")]
    income: String,

    #[arg(long, default_value = "")]
    state: String,

    /// Substring of the education level, e.g. "undergraduate"
    #[arg(long, default_value = "")]
    education: String,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::from_form(&self.category, &self.income, &self.state, &self.education)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Csv,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Csv => ReportFormat::Csv,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List scholarships matching the filters
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Show at most this many (the home view shows 20)
        #[arg(long)]
        limit: Option<usize>,

        /// Shortcut for --limit 20
        #[arg(long, conflicts_with = "limit")]
        home: bool,
    },
    /// Show every field of one scholarship
    Show { id: String },
    /// List the states present in the catalog
    States,
    /// Create a local account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Save a scholarship, or remove it if already saved
    Save { id: String },
    /// List saved scholarships
    Saved,
    /// Write a report of the filtered (or saved) scholarships
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Export saved scholarships instead of the filtered list
        #[arg(long)]
        saved: bool,

        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        /// Output path; defaults to the report's file name, "-" for stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
    }
    if let Some(path) = cli.storage {
        config.storage.path = path;
    }

    logging::init(&config.log.level)?;
    debug!(?config, "starting");

    match cli.command {
        Command::List { filters, limit, home } => {
            let limit = if home { Some(HOME_PREVIEW_LIMIT) } else { limit };
            run_list(&config, &filters, limit)
        }
        Command::Show { id } => run_show(&config, &id),
        Command::States => run_states(&config),
        Command::Register { username, email, password } => {
            let mut accounts = open_accounts(&config)?;
            let user = accounts.register(&username, &email, &password)?;
            println!("✓ Account created for {} ({})", user.username, user.email);
            println!(
                "  Log in with: scholarseva login --email {} --password <password>",
                user.email
            );
            Ok(())
        }
        Command::Login { email, password } => {
            let mut accounts = open_accounts(&config)?;
            let user = accounts.login(&email, &password)?;
            println!("✓ Logged in as {} ({})", user.username, user.email);
            Ok(())
        }
        Command::Logout => {
            let mut accounts = open_accounts(&config)?;
            accounts.logout()?;
            println!("✓ Logged out");
            Ok(())
        }
        Command::Whoami => {
            let accounts = open_accounts(&config)?;
            match accounts.current_user() {
                Some(user) => {
                    println!("{} ({})", user.username, user.email);
                    println!("Saved scholarships: {}", user.saved_scholarships.len());
                }
                None => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Save { id } => run_save(&config, &id),
        Command::Saved => run_saved(&config),
        Command::Export { filters, saved, format, out } => {
            run_export(&config, &filters, saved, format.into(), out)
        }
    }
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    Catalog::load(&config.catalog.path)
        .with_context(|| format!("Failed to load scholarships from {:?}", config.catalog.path))
}

fn open_accounts(config: &AppConfig) -> Result<AccountStore<SqliteStore>> {
    let storage = SqliteStore::open(&config.storage.path)
        .with_context(|| format!("Failed to open account storage {:?}", config.storage.path))?;
    Ok(AccountStore::new(storage))
}

/// Saved ids for the ★ markers. Browsing never creates the account database,
/// and an unreadable one only loses the markers.
fn saved_state(config: &AppConfig) -> BTreeSet<ScholarshipId> {
    if !config.storage.path.exists() {
        return BTreeSet::new();
    }

    match SqliteStore::open(&config.storage.path) {
        Ok(storage) => AccountStore::new(storage).saved_ids(),
        Err(e) => {
            warn!(error = %e, path = ?config.storage.path, "account storage unavailable");
            BTreeSet::new()
        }
    }
}

fn require_login() -> anyhow::Error {
    anyhow!(
        "{} Run: scholarseva login --email <email> --password <password>",
        AuthError::NotLoggedIn
    )
}

fn run_list(config: &AppConfig, filters: &FilterArgs, limit: Option<usize>) -> Result<()> {
    let mut catalog = load_catalog(config)?;
    let saved = saved_state(config);

    catalog.apply_filter(&filters.criteria());
    let shown = match limit {
        Some(limit) => catalog.preview(limit),
        None => catalog.filtered(),
    };

    if shown.is_empty() {
        println!("No Scholarships Found");
        println!("Try adjusting your filters to see more results.");
        return Ok(());
    }

    println!("Showing {} scholarship{}", shown.len(), if shown.len() == 1 { "" } else { "s" });
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for record in shown {
        print_card(record, saved.contains(&record.id));
    }
    Ok(())
}

fn print_card(record: &ScholarshipRecord, saved: bool) {
    let marker = if saved { "★" } else { "☆" };
    println!("\n{} [{}] {}  (id: {})", marker, record.origin().as_str(), record.name, record.id);
    println!("   Provider: {}", record.provider);
    println!("   State: {}", record.state);
    println!("   Education: {}", record.education_level);
    println!("   Income Limit: {}", record.income_limit);
}

fn run_show(config: &AppConfig, id: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let record = catalog
        .find(&ScholarshipId::from(id))
        .ok_or_else(|| anyhow!("Scholarship not found: {}", id))?;
    let saved = saved_state(config).contains(&record.id);

    println!("{}{}", record.name, if saved { "  ★ saved" } else { "" });
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Provider Organization: {}", record.provider);
    println!("Description:           {}", record.description);
    println!("State:                 {}", record.state);
    println!("Education Level:       {}", record.education_level);
    println!("Category:              {}", record.category);
    println!("Income Limit:          {}", record.income_limit);
    println!("Application Portal:    {}", record.apply_link.site_name);
    println!("Apply:                 {}", record.apply_link.url);
    Ok(())
}

fn run_states(config: &AppConfig) -> Result<()> {
    for state in load_catalog(config)?.states() {
        println!("{}", state);
    }
    Ok(())
}

fn run_save(config: &AppConfig, id: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let mut accounts = open_accounts(config)?;

    let id = ScholarshipId::from(id);
    let record = catalog
        .find(&id)
        .ok_or_else(|| anyhow!("Scholarship not found: {}", id))?;

    match accounts.toggle_saved(&id) {
        Ok(true) => println!("★ Saved: {}", record.name),
        Ok(false) => println!("☆ Removed from saved: {}", record.name),
        Err(AuthError::NotLoggedIn) => return Err(require_login()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn run_saved(config: &AppConfig) -> Result<()> {
    let accounts = open_accounts(config)?;
    let user = accounts.current_user().ok_or_else(require_login)?;
    let catalog = load_catalog(config)?;

    let saved = catalog.records_for(&user.saved_scholarships);
    if saved.is_empty() {
        println!("You haven't saved any scholarships yet.");
        println!("Browse with `scholarseva list` and save with `scholarseva save <id>`.");
        return Ok(());
    }

    println!(
        "You have {} saved scholarship{}",
        saved.len(),
        if saved.len() == 1 { "" } else { "s" }
    );
    for record in &saved {
        print_card(record, true);
    }
    Ok(())
}

fn run_export(
    config: &AppConfig,
    filters: &FilterArgs,
    saved: bool,
    format: ReportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut catalog = load_catalog(config)?;
    let accounts = open_accounts(config)?;
    let user = accounts.current_user();

    let records = if saved {
        let user = user.as_ref().ok_or_else(require_login)?;
        catalog.records_for(&user.saved_scholarships)
    } else {
        catalog.apply_filter(&filters.criteria()).to_vec()
    };

    let mut report = if saved {
        Report::saved(&records)?
    } else {
        Report::eligible(&records, filters.criteria().summary())?
    };
    if let Some(user) = &user {
        report = report.with_user(user);
    }

    let path = out.unwrap_or_else(|| PathBuf::from(report.file_name(format)));
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        report.write_to(format, stdout.lock())?;
        return Ok(());
    }

    let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    report.write_to(format, &mut writer)?;
    writer.flush()?;

    println!("✓ Exported {} scholarship(s) to {}", records.len(), path.display());
    Ok(())
}
