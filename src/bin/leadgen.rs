//! CLI binary for leadgen.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lead_engine::{ApiCredentials, LeadId, Query, ScoringWeights, Source};
use leadgen::{LeadgenConfig, fixtures, report};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Leadgen: find, deduplicate and score prospects across sources.
#[derive(Parser)]
#[command(name = "leadgen", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Search every enabled source and print ranked leads.
    Search(SearchArgs),

    /// Show or edit settings.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// List the sources that have an adapter.
    Sources {
        /// JSON fixture file (overrides the config file).
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text keywords.
    #[arg(default_value = "")]
    keywords: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// Source to query; repeat for several (linkedin, twitter, github, web).
    #[arg(long = "source")]
    sources: Vec<Source>,

    /// Target skill; repeat for several.
    #[arg(long = "skill")]
    skills: Vec<String>,

    /// Target industry; repeat for several.
    #[arg(long = "industry")]
    industries: Vec<String>,

    /// Drop leads scoring below this.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    min_score: Option<u8>,

    /// JSON fixture file (overrides the config file).
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Print only these lead ids, as full JSON records.
    #[arg(long = "export", value_delimiter = ',')]
    export: Vec<u64>,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print weights and which API keys are set.
    Show,

    /// Change scoring weights; omitted weights keep their value.
    SetWeights(WeightArgs),

    /// Store provider API keys; omitted keys keep their value.
    SetKey {
        #[arg(long)]
        linkedin: Option<String>,

        #[arg(long)]
        twitter: Option<String>,
    },
}

#[derive(Args)]
struct WeightArgs {
    #[arg(long)]
    decision_maker: Option<f64>,
    #[arg(long)]
    company_fit: Option<f64>,
    #[arg(long)]
    growth_potential: Option<f64>,
    #[arg(long)]
    skill_relevance: Option<f64>,
    #[arg(long)]
    location_relevance: Option<f64>,
    #[arg(long)]
    engagement_potential: Option<f64>,
}

impl WeightArgs {
    fn apply(&self, current: ScoringWeights) -> ScoringWeights {
        ScoringWeights {
            decision_maker: self.decision_maker.unwrap_or(current.decision_maker),
            company_fit: self.company_fit.unwrap_or(current.company_fit),
            growth_potential: self.growth_potential.unwrap_or(current.growth_potential),
            skill_relevance: self.skill_relevance.unwrap_or(current.skill_relevance),
            location_relevance: self.location_relevance.unwrap_or(current.location_relevance),
            engagement_potential: self
                .engagement_potential
                .unwrap_or(current.engagement_potential),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Users can override with RUST_LOG=debug to see everything.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leadgen=info,lead_engine=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(LeadgenConfig::default_config_path);
    let config = LeadgenConfig::load_or_default(&config_path)?;

    match cli.command {
        Command::Search(args) => run_search(config, args).await,
        Command::Config(command) => run_config(config, &config_path, command),
        Command::Sources { fixtures } => list_sources(&config, fixtures),
    }
}

async fn run_search(config: LeadgenConfig, args: SearchArgs) -> anyhow::Result<()> {
    let fixture_path = args.fixtures.clone().or_else(|| config.sources.fixtures.clone());
    let registry = fixtures::load_registry(fixture_path.as_deref())?;
    if registry.is_empty() {
        info!("no sources registered; pass --fixtures or set [sources] fixtures");
    }
    let engine = leadgen::build_engine(&config, registry)?;

    let sources = if args.sources.is_empty() {
        config.search.default_sources.clone()
    } else {
        args.sources
    };
    let query = Query {
        keywords: args.keywords,
        title: args.title,
        company: args.company,
        location: args.location,
        sources,
        skills: args.skills,
        industries: args.industries,
        min_score: args.min_score,
    };

    let handle = engine.start(query)?;
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling search...");
            cancel.cancel();
        }
    });
    let outcome = handle.wait().await?;

    if !args.export.is_empty() {
        let ids: Vec<LeadId> = args.export.into_iter().map(LeadId).collect();
        let leads = engine.export(outcome.session_id, &ids).await?;
        println!("{}", serde_json::to_string_pretty(&leads)?);
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", report::render_outcome(&outcome));
    }
    Ok(())
}

fn run_config(
    mut config: LeadgenConfig,
    path: &std::path::Path,
    command: ConfigCommand,
) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("Config file: {}", path.display());
            print!("{}", report::render_settings(&config.scoring, &config.credentials));
        }
        ConfigCommand::SetWeights(args) => {
            let weights = args.apply(config.scoring);
            let warnings = weights.validate()?;
            for warning in &warnings {
                println!("warning: {warning}");
            }
            config.scoring = weights;
            config.save_to_file(path)?;
            info!(path = %path.display(), "scoring weights saved");
        }
        ConfigCommand::SetKey { linkedin, twitter } => {
            config.credentials = config.credentials.merged(&ApiCredentials {
                linkedin_api_key: linkedin,
                twitter_api_key: twitter,
            });
            config.save_to_file(path)?;
            info!(path = %path.display(), "API keys saved");
        }
    }
    Ok(())
}

fn list_sources(config: &LeadgenConfig, fixture_flag: Option<PathBuf>) -> anyhow::Result<()> {
    let fixture_path = fixture_flag.or_else(|| config.sources.fixtures.clone());
    let registry = fixtures::load_registry(fixture_path.as_deref())?;
    for source in Source::all() {
        let state = if registry.contains(*source) {
            "available"
        } else {
            "no adapter"
        };
        println!("{:<10} {state}", source.id());
    }
    Ok(())
}
