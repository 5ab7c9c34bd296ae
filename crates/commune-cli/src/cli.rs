use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use commune_core::models::{ResourceKind, UserRole};

#[derive(Parser)]
#[command(name = "commune")]
#[command(about = "Manage commune portal content from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name (API endpoint and stored session)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Optional client config file (JSON) used as the base configuration
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the bearer session used for API calls
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List items of a resource
    #[command(alias = "ls")]
    List {
        /// Resource (news, slides, catalogue, personalities, users, posts, comments)
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Page number
        #[arg(long)]
        page: Option<u32>,
        /// Items per page
        #[arg(short, long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one item
    Show {
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an item from a JSON payload
    #[command(alias = "new")]
    Create {
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Update fields of an item from a JSON object
    #[command(alias = "edit")]
    Update {
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        id: String,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Delete an item (asks for confirmation)
    #[command(alias = "rm")]
    Delete {
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Change the status of a moderated item
    Status {
        #[arg(value_parser = parse_resource)]
        resource: ResourceKind,
        id: String,
        /// Target status (e.g. published, archived, blocked)
        status: String,
    },
    /// Upload a file and print its stored URL
    Upload {
        path: PathBuf,
        /// Upload as a PDF document instead of an image
        #[arg(long)]
        document: bool,
    },
    /// Inspect the local keyed store
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PayloadArgs {
    /// JSON payload (`-` reads from stdin)
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
    /// File uploaded before the mutation
    #[arg(long, value_name = "PATH")]
    pub attach: Option<PathBuf>,
    /// Payload field receiving the uploaded URL
    #[arg(long, value_name = "NAME", requires = "attach")]
    pub field: Option<String>,
    /// Upload the attachment as a PDF document
    #[arg(long, requires = "attach")]
    pub document: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Portal API base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Route shown to users after the session ends
        #[arg(long, value_name = "ROUTE")]
        login_route: Option<String>,
        /// Directory of the local keyed store
        #[arg(long, value_name = "PATH")]
        store_dir: Option<PathBuf>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the effective configuration
    Show {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a bearer token issued by the portal auth service
    SetToken {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Access token
        token: String,
        /// Expiry as unix seconds
        #[arg(long, value_name = "SECONDS")]
        expires_at: Option<i64>,
        /// Account id
        #[arg(long, value_name = "ID", default_value = "cli")]
        user_id: String,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Display name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
        /// Account role
        #[arg(long, value_enum, default_value_t = RoleArg::Admin)]
        role: RoleArg,
    },
    /// Show auth status for profile
    Status {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Clear the stored session
    Logout {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Print a stored entry
    Show {
        /// Entry key (maire_data, mainHomeContent, personality_proposals, personality_likes)
        key: String,
    },
    /// Remove a stored entry
    Clear {
        key: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Editor,
    Moderator,
    Citizen,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Self::Admin,
            RoleArg::Editor => Self::Editor,
            RoleArg::Moderator => Self::Moderator,
            RoleArg::Citizen => Self::Citizen,
        }
    }
}

fn parse_resource(value: &str) -> Result<ResourceKind, String> {
    value.parse().map_err(|error: commune_core::models::ValidationError| error.to_string())
}
