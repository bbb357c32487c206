// File: olivia-server/src/args.rs

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "olivia")]
#[command(author, version, about = "Olivia - facility class scheduling assistant")]
pub struct Args {
    /// Address to which the HTTP server will bind
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub addr: String,

    /// Postgres connection URL (falls back to DATABASE_URL). Without one the
    /// catalog lives in memory.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory holding facilities.json, branch_proximity.json, member_profiles.json
    #[arg(long, default_value = "configs")]
    pub config_dir: PathBuf,

    /// Catalog seed (branches, classes, sessions, enrollments) in JSON
    #[arg(long)]
    pub seed_file: Option<PathBuf>,

    /// IANA timezone that "today" and calendar days are computed in
    #[arg(long, default_value = "America/New_York")]
    pub timezone: String,

    /// "ollama", "openai" or "none"
    #[arg(long, default_value = "ollama")]
    pub llm_provider: String,

    #[arg(long)]
    pub llm_base_url: Option<String>,

    #[arg(long, default_value = "llama3.2:3b")]
    pub llm_model: String,

    #[arg(long, default_value_t = 120)]
    pub llm_timeout_secs: u64,

    /// Idle conversations are dropped after this many seconds
    #[arg(long, default_value_t = 3600)]
    pub conversation_ttl_secs: u64,

    /// Apply migrations on startup (Postgres only)
    #[arg(long, default_value = "false")]
    pub migrate: bool,
}
