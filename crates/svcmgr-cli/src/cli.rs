use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "svcmgr")]
#[command(version)]
#[command(about = "Self-hosted web services behind a shared reverse proxy", long_about = None)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Directory holding the managed domains (overrides the configuration file)
    #[arg(long, global = true, value_name = "DIR")]
    pub root_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage domains
    Domain {
        #[command(subcommand)]
        command: DomainCommands,
    },
    /// Manage subdomains of a domain
    Subdomain {
        #[command(subcommand)]
        command: SubdomainCommands,
    },
    /// Manage the module bound to a subdomain
    Module {
        #[command(subcommand)]
        command: ModuleCommands,
    },
    /// Interactive prompt that remembers the selected domain and subdomain
    Shell,
}

#[derive(Subcommand, Debug)]
pub enum DomainCommands {
    /// List managed domains
    List,
    /// Select a domain, creating it if needed
    #[command(alias = "create")]
    Select {
        name: String,
    },
    /// Tear down every subdomain of a domain and remove it
    Delete {
        name: String,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

/// The domain an operation applies to; falls back to the shell selection.
#[derive(Args, Debug, Clone, Default)]
pub struct DomainArg {
    /// Domain name, e.g. example.com
    #[arg(long, short)]
    pub domain: Option<String>,
}

/// The subdomain an operation applies to; both fall back to the shell selection.
#[derive(Args, Debug, Clone, Default)]
pub struct Target {
    /// Domain name, e.g. example.com
    #[arg(long, short)]
    pub domain: Option<String>,
    /// Subdomain label (`blog`), full name (`blog.example.com`) or the domain for the apex
    #[arg(long, short)]
    pub subdomain: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SubdomainCommands {
    /// List the subdomains of a domain and their modules
    List {
        #[command(flatten)]
        domain: DomainArg,
    },
    /// Select a subdomain, creating it if needed
    #[command(alias = "create")]
    Select {
        label: String,
        #[command(flatten)]
        domain: DomainArg,
    },
    /// Unbind the module of a subdomain and remove it
    Delete {
        label: String,
        #[command(flatten)]
        domain: DomainArg,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// List the available module types
    List,
    /// Bind a module type to a subdomain, replacing the current one
    #[command(alias = "create")]
    Add {
        /// Module type, e.g. WordPress
        module_type: String,
        #[command(flatten)]
        target: Target,
    },
    /// Show the module type bound to a subdomain
    Get {
        #[command(flatten)]
        target: Target,
    },
    /// Start the containers and route the subdomain to them
    Up {
        #[command(flatten)]
        target: Target,
    },
    /// Stop the containers and remove the route
    Down {
        #[command(flatten)]
        target: Target,
    },
    /// Show the lifecycle state and the running services
    Status {
        #[command(flatten)]
        target: Target,
    },
    /// Follow the logs of one service
    Log {
        service: String,
        #[command(flatten)]
        target: Target,
    },
    /// Run a command inside one service
    #[command(alias = "cmd")]
    Command {
        service: String,
        /// Command and arguments (default: sh)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Stop the module and delete its data, env file and route
    #[command(alias = "rm", alias = "clean")]
    Delete {
        #[command(flatten)]
        target: Target,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Import an SQL dump into the module's MySQL server
    ImportDb {
        dump: PathBuf,
        #[command(flatten)]
        target: Target,
    },
    /// Open a MySQL prompt as root
    Mysql {
        #[command(flatten)]
        target: Target,
    },
    /// Copy a directory into the module's web root
    CopyWeb {
        source: PathBuf,
        /// Directory under the subdomain that serves the files
        #[arg(long, default_value = "httpdocs")]
        web_dir: String,
        #[command(flatten)]
        target: Target,
    },
}
