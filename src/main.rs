//! CLI entry point for mdxpress

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mdxpress::commands::build::BuildOptions;
use mdxpress::commands::new::NewPostOptions;
use mdxpress::Site;

#[derive(Parser)]
#[command(name = "mdxpress")]
#[command(version)]
#[command(about = "Build-time content pipeline for Markdown/MDX blogs", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// Mark the post as a draft
        #[arg(long)]
        draft: bool,

        /// Create a Markdown (.md) file instead of MDX
        #[arg(long)]
        md: bool,
    },

    /// Build feeds and bundles
    #[command(alias = "g")]
    Build {
        /// Fail the build on the first compile error
        #[arg(long)]
        strict: bool,

        /// Include drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Remove generated feeds and bundles
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, tag, draft)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdxpress=debug,info"
    } else {
        "mdxpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            mdxpress::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::New { title, draft, md } => {
            let site = Site::new(&base_dir)?;
            let options = NewPostOptions {
                draft,
                markdown: md,
            };
            let path = mdxpress::commands::new::create_post(&site, &title, options)?;
            println!("Created: {:?}", path);
        }

        Commands::Build { strict, drafts } => {
            let site = Site::new(&base_dir)?;
            let mut options = BuildOptions::from_config(&site.config.build);
            options.strict |= strict;
            options.drafts |= drafts;

            tracing::info!("Building {:?}...", site.content_dir);
            let report = mdxpress::commands::build::run(&site, &options).await?;

            if !report.is_success() {
                eprintln!("Build finished with {} failures:", report.failures.len());
                for failure in &report.failures {
                    eprintln!("  {}: {}", failure.path.display(), failure.error);
                }
                return Ok(ExitCode::FAILURE);
            }
            println!(
                "Built {} posts: {} bundles, {} feeds",
                report.posts,
                report.bundles,
                report.feeds.len()
            );
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Cleaning generated files...");
            mdxpress::commands::clean::run(&site)?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            mdxpress::commands::list::run(&site, &r#type).await?;
        }

        Commands::Version => {
            println!("mdxpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(ExitCode::SUCCESS)
}
