pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ripple")]
#[command(about = "Ripple - Stacked diffs for Jujutsu")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the repository for Ripple
    Init {
        /// Force initialization even if already initialized
        #[arg(long)]
        force: bool,
    },

    /// Create a new stack with its initial blocks
    Create {
        /// Stack name (prompted for if omitted)
        name: Option<String>,

        /// Upstream bookmark new base-level blocks are created against
        #[arg(long)]
        target_bookmark: Option<String>,

        /// Prefix for derived bookmark names (bookmark = prefix + index)
        #[arg(long)]
        bookmark_prefix: Option<String>,

        /// Prefix prepended to every block's description
        #[arg(long)]
        commit_prefix: Option<String>,

        /// Initial block name (repeatable, ordered; prompted for if omitted)
        #[arg(long = "block")]
        blocks: Vec<String>,
    },

    /// List all stacks with their progress
    List,

    /// Show the current stack's blocks
    Status,

    /// Switch to another stack, resuming at its first open block
    Switch {
        /// Stack name
        name: String,
    },

    /// Add a block to the current stack
    Add {
        /// Block name
        name: String,

        /// Insertion index (defaults to the end of the stack)
        #[arg(long, short)]
        index: Option<i64>,
    },

    /// Change a block's description
    Describe {
        /// New description (the stack's commit prefix is prepended)
        name: String,

        /// Block index (defaults to the current block)
        #[arg(long, short)]
        index: Option<i64>,
    },

    /// Check out a block for editing
    Edit {
        /// Block index
        #[arg(long, short)]
        index: i64,
    },

    /// Submit a block to the remote (or update its remote bookmark)
    Submit {
        /// Block index (defaults to the current block)
        #[arg(long, short)]
        index: Option<i64>,
    },

    /// Mark a block merged and advance into the next one
    Merge {
        /// Block index (defaults to the current block)
        #[arg(long, short)]
        index: Option<i64>,
    },

    /// Fetch upstream and rebase the first open block onto the target bookmark
    Sync,

    /// Abandon a block and remove it from the stack
    Remove {
        /// Block index (defaults to the current block)
        #[arg(long, short)]
        index: Option<i64>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::Init { force } => commands::init::run(force).await,
            Commands::Create {
                name,
                target_bookmark,
                bookmark_prefix,
                commit_prefix,
                blocks,
            } => {
                commands::create::run(name, target_bookmark, bookmark_prefix, commit_prefix, blocks)
                    .await
            }
            Commands::List => commands::list::run().await,
            Commands::Status => commands::status::run().await,
            Commands::Switch { name } => commands::switch::run(name).await,
            Commands::Add { name, index } => commands::block::add(name, index).await,
            Commands::Describe { name, index } => commands::block::describe(name, index).await,
            Commands::Edit { index } => commands::block::edit(index).await,
            Commands::Submit { index } => commands::block::submit(index).await,
            Commands::Merge { index } => commands::block::merge(index).await,
            Commands::Sync => commands::block::sync().await,
            Commands::Remove { index } => commands::block::remove(index).await,
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time();

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}
