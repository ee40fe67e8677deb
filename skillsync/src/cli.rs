///
/// This module implements the CLI interface for skillsync: command parsing,
/// argument validation and user-visible output.
///
/// All data models and engines live in the `skillsync-core` crate. This module
/// only wires collaborators together and prints reports.
///
/// ## How To Use
/// - For command-line users: use the installed `skillsync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, load_optional_config};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skillsync_core::catalog::{
    framework_definition, AgentId, DetectionRegistry, DEFAULT_REGISTRY, FALLBACK_REF,
    SUPPORTED_AGENTS, SUPPORTED_FRAMEWORKS,
};
use skillsync_core::checkout::GitCheckout;
use skillsync_core::config::{build_initial_config, ConfigStore};
use skillsync_core::contract::{DependencyDetector, RemoteTree};
use skillsync_core::detect::{detect_agents, detect_frameworks, ManifestDetector};
use skillsync_core::diagnostics::{Diagnostic, Severity};
use skillsync_core::materialize::Materializer;
use skillsync_core::reconcile::{list_skills, reconcile};
use skillsync_core::registry::{fetch_metadata, parse_registry_locator, RegistryMetadata};
use skillsync_core::resolve::category_ref;
use skillsync_core::synchronise::{synchronise, SyncContext};
use std::path::PathBuf;

/// CLI for skillsync: sync curated agent skills into a project.
#[derive(Parser)]
#[clap(
    name = "skillsync",
    version,
    about = "Sync curated agent skill bundles from a registry repository into this project"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Where the project and the registry clone live.
#[derive(Args, Debug, Clone)]
pub struct Location {
    /// Project root holding `.skillsrc`
    #[clap(long, env = "SKILLSYNC_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Local clone of the registry repository
    #[clap(long, env = "SKILLSYNC_CHECKOUT")]
    pub checkout: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile `.skillsrc` with the project's dependencies and sync every configured category
    Sync {
        #[clap(flatten)]
        location: Location,
    },
    /// Write an initial `.skillsrc`
    Init {
        /// Framework category to start from; detected when omitted
        #[clap(long)]
        framework: Option<String>,
        /// Target agent, repeatable; detected when omitted
        #[clap(long = "agent", value_parser = parse_agent)]
        agents: Vec<AgentId>,
        /// Registry repository URL
        #[clap(long)]
        registry: Option<String>,
        /// Overwrite an existing `.skillsrc`
        #[clap(long)]
        force: bool,
        #[clap(flatten)]
        location: Location,
    },
    /// List the skills a category offers and whether the project uses them
    List {
        #[clap(long)]
        category: String,
        #[clap(flatten)]
        location: Location,
    },
}

fn parse_agent(raw: &str) -> Result<AgentId, String> {
    AgentId::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = AgentId::ALL.iter().map(|a| a.as_str()).collect();
        format!("unknown agent {raw:?}, expected one of: {}", known.join(", "))
    })
}

fn registry_checkout(location: &Location) -> Result<GitCheckout> {
    let dir = location.checkout.clone().context(
        "no registry checkout configured: pass --checkout <dir> or set SKILLSYNC_CHECKOUT",
    )?;
    Ok(GitCheckout::new(dir))
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Error => eprintln!("  {diagnostic}"),
            _ => println!("  {diagnostic}"),
        }
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("cli_started");

    match cli.command {
        Commands::Sync { location } => run_sync(location).await,
        Commands::Init {
            framework,
            agents,
            registry,
            force,
            location,
        } => run_init(framework, agents, registry, force, location).await,
        Commands::List { category, location } => run_list(category, location).await,
    }
}

async fn run_sync(location: Location) -> Result<()> {
    let mut config = load_config(&location.project)?;
    let remote = registry_checkout(&location)?;
    tracing::info!(command = "sync", "Starting synchronisation process");

    let detected = ManifestDetector.detect(&location.project);
    let store = ConfigStore::new(&location.project);
    let rules = DetectionRegistry::builtin();
    let materializer = Materializer::new(&location.project);
    let ctx = SyncContext {
        store: &store,
        remote: &remote,
        detected: &detected,
        rules: &rules,
        materializer: &materializer,
    };

    println!(
        "Syncing skills from {} (checkout {})...",
        config.registry,
        remote.repo_dir().display()
    );
    match synchronise(&mut config, &ctx).await {
        Ok(report) => {
            print_diagnostics(&report.diagnostics);
            println!(
                "All skills synced: {} bundles, {} files written, {} protected.",
                report.bundles.len(),
                report.materialized.written.len(),
                report.materialized.overridden.len()
            );
            tracing::info!(command = "sync", "Synchronisation complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e).context("Sync failed"))
        }
    }
}

async fn run_init(
    framework: Option<String>,
    agents: Vec<AgentId>,
    registry: Option<String>,
    force: bool,
    location: Location,
) -> Result<()> {
    let project = &location.project;
    let store = ConfigStore::new(project);
    if store.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            store.path().display()
        );
    }

    let registry = registry.unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
    let detected = ManifestDetector.detect(project);

    let framework = match framework {
        Some(id) => framework_definition(&id).with_context(|| {
            let known: Vec<&str> = SUPPORTED_FRAMEWORKS.iter().map(|f| f.id).collect();
            format!("unknown framework {id:?}, expected one of: {}", known.join(", "))
        })?,
        None => detect_frameworks(project, &detected, SUPPORTED_FRAMEWORKS)
            .first()
            .copied()
            .context("could not detect the project's framework, pass --framework")?,
    };
    tracing::info!(framework = framework.id, "Initialising config");

    let agents = if agents.is_empty() {
        let found = detect_agents(project, SUPPORTED_AGENTS);
        if found.is_empty() {
            vec![AgentId::Cursor]
        } else {
            found
        }
    } else {
        agents
    };

    let metadata = match (&location.checkout, parse_registry_locator(&registry)) {
        (Some(dir), Some(locator)) => {
            let remote = GitCheckout::new(dir);
            let reference = remote
                .get_repo_info(&locator.owner, &locator.repo)
                .await
                .and_then(|info| info.default_ref)
                .unwrap_or_else(|| FALLBACK_REF.to_string());
            fetch_metadata(&remote, &locator, &reference).await
        }
        _ => RegistryMetadata::default(),
    };

    let mut config = build_initial_config(framework.id, agents, &registry, &metadata);
    config.validate()?;
    let reconciliation = reconcile(&mut config, &detected, &DetectionRegistry::builtin());
    store.save(&config)?;

    println!("Created {} for {}.", store.path().display(), framework.name);
    for (category, skill) in &reconciliation.disabled {
        println!("  - {category}/{skill} excluded (not used by this project)");
    }
    Ok(())
}

async fn run_list(category: String, location: Location) -> Result<()> {
    let config = load_optional_config(&location.project)?;
    let registry = config
        .as_ref()
        .map(|c| c.registry.clone())
        .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
    let locator = parse_registry_locator(&registry)
        .with_context(|| format!("only GitHub registries are supported, got {registry:?}"))?;
    let remote = registry_checkout(&location)?;

    let default_ref = remote
        .get_repo_info(&locator.owner, &locator.repo)
        .await
        .and_then(|info| info.default_ref)
        .unwrap_or_else(|| FALLBACK_REF.to_string());
    let reference = match &config {
        Some(config) => category_ref(config, &category, &default_ref),
        None => default_ref,
    };

    let entries = match remote
        .get_repo_tree(&locator.owner, &locator.repo, &reference)
        .await
    {
        Some(tree) => tree.entries,
        None => {
            eprintln!("Failed to fetch {category}@{reference}, showing known rules only.");
            Vec::new()
        }
    };

    let detected = ManifestDetector.detect(&location.project);
    println!("Available skills for {category} ({reference}):");
    let rules = DetectionRegistry::builtin();
    for (skill, status) in list_skills(&category, &entries, &detected, &rules) {
        println!("- {skill} ({})", status.label());
    }
    println!(
        "\nTip: use the exclude list in .skillsrc to disable sub-skills before running sync."
    );
    Ok(())
}
