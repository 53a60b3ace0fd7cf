use anyhow::Result;
use bbpackage::commands::{self, Config, Options};
use bbpackage::http::DEFAULT_MAX_REDIRECTS;
use bbpackage::runtime::RealRuntime;
use clap::Parser;
use std::path::PathBuf;

/// bbpackage - BBEdit package manager
///
/// Search the package registry, install and uninstall packages, and
/// register new ones.
///
/// Examples:
///   bbpackage search lint      # Find packages matching "lint"
///   bbpackage install jshint   # Install jshint.bbpackage
///   bbpackage uninstall jshint # Remove it again
#[derive(Parser, Debug)]
#[command(author, version = env!("BBPACKAGE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Package installation root (also via BBPACKAGE_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "BBPACKAGE_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Registry base URL (defaults to http://bbpackages.org:3000)
    #[arg(
        long = "registry-url",
        env = "BBPACKAGE_REGISTRY_URL",
        value_name = "URL",
        global = true
    )]
    pub registry_url: Option<String>,

    /// Maximum number of redirects followed while downloading
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_REDIRECTS, global = true)]
    pub max_redirects: usize,

    /// Accept invalid TLS certificates when downloading packages
    #[arg(long, env = "BBPACKAGE_INSECURE", global = true)]
    pub insecure: bool,

    /// Do not run the dependency installer after installing a package
    #[arg(long = "skip-deps", global = true)]
    pub skip_deps: bool,

    /// Program used to install package dependencies
    #[arg(
        long = "npm",
        env = "BBPACKAGE_NPM",
        value_name = "PROGRAM",
        default_value = "npm",
        global = true
    )]
    pub npm: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search for a package by name
    Search(SearchArgs),

    /// Install a package locally
    Install(NameArgs),

    /// Remove a local package
    Uninstall(NameArgs),

    /// Register a package with the registry
    Register(RegisterArgs),

    /// List installed packages
    List,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in package names
    #[arg(value_name = "TERM")]
    pub term: String,
}

#[derive(clap::Args, Debug)]
pub struct NameArgs {
    /// Package name, with or without the .bbpackage suffix
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    /// Package name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// URL of the package's zip archive
    #[arg(value_name = "URL")]
    pub url: String,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            install_root: self.install_root.clone(),
            registry_url: self.registry_url.clone(),
            max_redirects: self.max_redirects,
            insecure: self.insecure,
            skip_dependencies: self.skip_deps,
            dependency_program: self.npm.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(RealRuntime, cli.options())?;

    match cli.command {
        Commands::Search(args) => commands::search(&args.term, &config).await?,
        Commands::Install(args) => commands::install(&args.name, &config).await?,
        Commands::Uninstall(args) => commands::uninstall(&args.name, &config)?,
        Commands::Register(args) => commands::register(&args.name, &args.url, &config).await?,
        Commands::List => commands::list(&config)?,
    }
    Ok(())
}
