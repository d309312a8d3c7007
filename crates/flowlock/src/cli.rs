use clap::{Parser, Subcommand};

/// Build version string combining Cargo.toml version and git describe.
fn build_version() -> &'static str {
    static VERSION: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION.get_or_init(|| {
        let cargo_ver = env!("CARGO_PKG_VERSION");
        let git_desc = env!("FLOWLOCK_GIT_DESCRIBE");
        if git_desc.is_empty() {
            cargo_ver.to_string()
        } else {
            format!("{cargo_ver} ({git_desc})")
        }
    })
}

#[derive(Parser)]
#[command(name = "flowlock", version = build_version())]
#[command(about = "Compile agentic workflow markdown into pinned GitHub Actions lock files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose diagnostics on stderr
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile one or more workflow files (or a directory of them)
    Compile {
        /// Workflow .md files or directories containing them
        #[arg(required = true)]
        paths: Vec<String>,

        /// Strict validation profile (unpinned actions, custom-job
        /// writes, wildcard network all become errors)
        #[arg(long)]
        strict: bool,

        /// Run the full pipeline but write nothing
        #[arg(long, conflicts_with = "check")]
        no_emit: bool,

        /// Recompile in memory and fail if the on-disk lock file drifts
        #[arg(long)]
        check: bool,

        /// Skip subprocess probes and online action-pin resolution
        #[arg(long)]
        offline: bool,

        /// Minify embedded JS payloads through terser when available
        #[arg(long)]
        minify: bool,
    },
}
