use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use delivery::{DEFAULT_PORT, ServiceKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bridgectl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy, configure and control Bridge services", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deliver a project's services to the nodes of a domain
    Deliver(DeliverArgs),

    /// Start a service
    Start(ServiceArgs),

    /// Stop a service
    Stop(ServiceArgs),

    /// Kill a service (not available for Node.js services)
    Kill(ServiceArgs),

    /// Remove a service
    Remove(ServiceArgs),

    /// Deploy a repository
    Deploy(DeployArgs),

    /// Build a repository archive from a service directory
    Pack(PackArgs),

    /// Show or change service settings: `settings <service> [set NAME VALUE]...`
    Settings(AttributeArgs),

    /// Show or change service preferences: `preferences <service> [pref NAME VALUE]...`
    Preferences(AttributeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Continuous delivery
// ============================================================================

#[derive(Args)]
pub struct DeliverArgs {
    /// Domain to deliver to
    pub domain: String,

    /// Project directory (domains/, nodes/, solutions/, services/, repositories/)
    #[arg(short = 'C', long, default_value = ".", env = "BRIDGECTL_PROJECT")]
    pub project: PathBuf,

    /// Only these nodes (repeatable)
    #[arg(long = "node", value_name = "NODE")]
    pub nodes: Vec<String>,

    /// Only nodes carrying one of these labels (repeatable)
    #[arg(long = "label", value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Only these solutions (repeatable)
    #[arg(long = "solution", value_name = "SOLUTION")]
    pub solutions: Vec<String>,

    /// Only these services (repeatable)
    #[arg(long = "service", value_name = "SERVICE")]
    pub services: Vec<String>,

    /// Show what would be done without contacting any node
    #[arg(short, long)]
    pub dry_run: bool,

    /// Abort the node's batch and the run on the first failure
    #[arg(long)]
    pub break_on_error: bool,
}

// ============================================================================
// Single service operations
// ============================================================================

/// Bridge connection flags shared by all single service commands
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// Host that runs the Bridge
    #[arg(short = 'H', long, default_value = "localhost")]
    pub host: String,

    /// Port of the Bridge
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Name of the Bridge node (defaults to the host)
    #[arg(short, long)]
    pub node: Option<String>,

    /// Bridge user, prompted for when missing
    #[arg(short, long, env = "BRIDGE_USER")]
    pub user: Option<String>,

    /// Password of the Bridge user, prompted for (masked) when missing
    #[arg(short = 'P', long)]
    pub password: Option<String>,
}

impl ConnectionArgs {
    pub fn node_name(&self) -> &str {
        self.node.as_deref().unwrap_or(&self.host)
    }
}

/// Runtime of the addressed service
#[derive(Args, Clone, Copy)]
pub struct KindArgs {
    /// The service is a Node.js service
    #[arg(short = 'N', long, conflicts_with = "java")]
    pub nodejs: bool,

    /// The service is a Java service
    #[arg(short, long)]
    pub java: bool,
}

impl KindArgs {
    pub fn kind(self) -> ServiceKind {
        if self.nodejs {
            ServiceKind::Node
        } else if self.java {
            ServiceKind::Java
        } else {
            ServiceKind::Xuml
        }
    }
}

#[derive(Args)]
pub struct ServiceArgs {
    /// Service name
    pub service: String,

    #[command(flatten)]
    pub kind: KindArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Repository file to deploy
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Deployment options, comma separated:
    /// startup,overwrite,settings,npm_install,npm_install_run_scripts,instance_name=NAME
    #[arg(short, long = "options", alias = "option")]
    pub options: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct PackArgs {
    /// Directory to pack
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Repository file to write (defaults to <name>-<version>.zip next to the directory)
    pub output: Option<PathBuf>,

    /// Build the repository with `git archive`
    #[arg(short, long)]
    pub git: bool,

    /// Run `npm shrinkwrap` before packing
    #[arg(short, long)]
    pub shrinkwrap: bool,
}

#[derive(Args)]
pub struct AttributeArgs {
    /// Service name
    pub service: String,

    /// Assignments as `set NAME VALUE` (settings) or `pref NAME VALUE` (preferences)
    #[arg(num_args = 0..)]
    pub assignments: Vec<String>,

    #[command(flatten)]
    pub kind: KindArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_connection_defaults() {
        let cli = Cli::try_parse_from(["bridgectl", "start", "Svc"]).unwrap();
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.connection.host, "localhost");
        assert_eq!(args.connection.port, 8080);
        assert_eq!(args.connection.node_name(), "localhost");
        assert_eq!(args.kind.kind(), ServiceKind::Xuml);
    }

    #[test]
    fn test_nodejs_and_java_conflict() {
        assert!(Cli::try_parse_from(["bridgectl", "stop", "Svc", "-N", "-j"]).is_err());
        let cli = Cli::try_parse_from(["bridgectl", "stop", "Svc", "--java"]).unwrap();
        let Command::Stop(args) = cli.command else {
            panic!("expected stop");
        };
        assert_eq!(args.kind.kind(), ServiceKind::Java);
    }

    #[test]
    fn test_deliver_filters_repeat() {
        let cli = Cli::try_parse_from([
            "bridgectl",
            "deliver",
            "production",
            "--node",
            "prod1",
            "--node",
            "prod2",
            "--dry-run",
        ])
        .unwrap();
        let Command::Deliver(args) = cli.command else {
            panic!("expected deliver");
        };
        assert_eq!(args.domain, "production");
        assert_eq!(args.nodes, ["prod1", "prod2"]);
        assert!(args.dry_run);
        assert!(!args.break_on_error);
    }

    #[test]
    fn test_pack_arguments() {
        let cli =
            Cli::try_parse_from(["bridgectl", "pack", "svc", "out/svc.zip", "-g", "-s"]).unwrap();
        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        assert_eq!(args.directory, PathBuf::from("svc"));
        assert_eq!(args.output, Some(PathBuf::from("out/svc.zip")));
        assert!(args.git);
        assert!(args.shrinkwrap);

        let cli = Cli::try_parse_from(["bridgectl", "pack"]).unwrap();
        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        assert_eq!(args.directory, PathBuf::from("."));
        assert_eq!(args.output, None);
    }

    #[test]
    fn test_settings_assignments() {
        let cli = Cli::try_parse_from([
            "bridgectl",
            "settings",
            "Svc",
            "set",
            "configFile",
            "other",
            "-H",
            "bridge.example.com",
        ])
        .unwrap();
        let Command::Settings(args) = cli.command else {
            panic!("expected settings");
        };
        assert_eq!(args.assignments, ["set", "configFile", "other"]);
        assert_eq!(args.connection.host, "bridge.example.com");
    }
}
