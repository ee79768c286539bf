mod config;
mod http_client;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use georep_executor::{GeoReplicationAction, GeoReplicationRequest};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{default_config_path, Config};
use crate::http_client::Client;

const DEFAULT_SERVER: &str = "http://localhost:8080";

/// Everything but unreserved characters, so uuids pass through untouched
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

#[derive(Parser, Debug)]
#[command(name = "georepctl")]
#[command(about = "Geo-replication control plane CLI", long_about = None)]
struct Args {
    /// Control plane URL (falls back to the saved config, then localhost)
    #[arg(long, env = "GEOREP_SERVER")]
    server: Option<String>,

    /// Load config from this path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save --server into the config
    #[arg(long, default_value_t = false)]
    save_server: bool,

    /// HTTP timeout seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Retry count (429 always retried; 502-504 retried for GET)
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Milliseconds between polls of a queued operation
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Give up on a queued operation after this many seconds
    #[arg(long, default_value_t = 900)]
    wait_secs: u64,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clusters
    Cluster {
        #[command(subcommand)]
        cmd: ClusterCmd,
    },

    /// Storage nodes
    Node {
        #[command(subcommand)]
        cmd: NodeCmd,
    },

    /// Master volumes
    Volume {
        #[command(subcommand)]
        cmd: VolumeCmd,
    },

    /// Geo-replication sessions
    Georep {
        #[command(subcommand)]
        cmd: GeorepCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ClusterCmd {
    Create,
    List,
}

#[derive(Subcommand, Debug)]
enum NodeCmd {
    Add {
        #[arg(long)]
        cluster: String,
        /// Hostname commands are sent to
        #[arg(long)]
        manage: String,
        /// Storage network hostname (defaults to --manage)
        #[arg(long)]
        storage: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum VolumeCmd {
    Create {
        /// Gluster volume name
        #[arg(long)]
        name: String,
        #[arg(long)]
        cluster: String,
    },
    List,
}

#[derive(ClapArgs, Debug)]
struct SessionArgs {
    /// Volume id of the master volume
    volume_id: String,
    #[arg(long)]
    slave_host: String,
    #[arg(long)]
    slave_volume: String,
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CreateOption {
    PushPem,
    NoVerify,
}

impl CreateOption {
    fn as_str(&self) -> &'static str {
        match self {
            CreateOption::PushPem => "push-pem",
            CreateOption::NoVerify => "no-verify",
        }
    }
}

#[derive(Subcommand, Debug)]
enum GeorepCmd {
    /// Create a session from a master volume to a slave volume
    Create {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, value_enum, default_value_t = CreateOption::PushPem)]
        option: CreateOption,
        /// SSH port on the slave host
        #[arg(long)]
        ssh_port: Option<u16>,
    },
    /// Set session options, e.g. --set sync-jobs=3 --set use-tarssh=true
    Config {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },
    Start {
        #[command(flatten)]
        session: SessionArgs,
    },
    Stop {
        #[command(flatten)]
        session: SessionArgs,
    },
    Pause {
        #[command(flatten)]
        session: SessionArgs,
    },
    Resume {
        #[command(flatten)]
        session: SessionArgs,
    },
    Delete {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Sessions of one master volume
    Status { volume_id: String },
    /// Every session on a cluster
    ClusterStatus { cluster_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging
    let lvl = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(lvl).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cfg_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut cfg = Config::load(&cfg_path)?;

    if args.save_server {
        let server = args
            .server
            .clone()
            .context("--save-server needs --server")?;
        cfg.server = Some(server);
        cfg.save(&cfg_path)?;
    }

    let server = args
        .server
        .clone()
        .or_else(|| cfg.server.clone())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());

    let client = Client::new(
        &server,
        Duration::from_secs(args.timeout_secs),
        args.retries,
    )?
    .with_polling(
        Duration::from_millis(args.poll_interval_ms),
        Duration::from_secs(args.wait_secs),
    );

    match args.cmd {
        Command::Cluster { cmd } => run_cluster(&client, cmd).await,
        Command::Node { cmd } => run_node(&client, cmd).await,
        Command::Volume { cmd } => run_volume(&client, cmd).await,
        Command::Georep { cmd } => run_georep(&client, cmd).await,
    }
}

async fn run_cluster(client: &Client, cmd: ClusterCmd) -> Result<()> {
    match cmd {
        ClusterCmd::Create => client.send_json(Method::POST, "/clusters", None).await,
        ClusterCmd::List => client.send_json(Method::GET, "/clusters", None).await,
    }
}

async fn run_node(client: &Client, cmd: NodeCmd) -> Result<()> {
    match cmd {
        NodeCmd::Add {
            cluster,
            manage,
            storage,
        } => {
            let body = serde_json::json!({
                "cluster_id": cluster,
                "manage_hostname": manage,
                "storage_hostname": storage,
            });
            client.send_json(Method::POST, "/nodes", Some(body)).await
        }
    }
}

async fn run_volume(client: &Client, cmd: VolumeCmd) -> Result<()> {
    match cmd {
        VolumeCmd::Create { name, cluster } => {
            let body = serde_json::json!({
                "name": name,
                "cluster_id": cluster,
            });
            client.send_json(Method::POST, "/volumes", Some(body)).await
        }
        VolumeCmd::List => client.send_json(Method::GET, "/volumes", None).await,
    }
}

async fn run_georep(client: &Client, cmd: GeorepCmd) -> Result<()> {
    let (volume_id, request) = match cmd {
        GeorepCmd::Status { volume_id } => {
            return client
                .send_json(Method::GET, &volume_georep_path(&volume_id), None)
                .await
        }
        GeorepCmd::ClusterStatus { cluster_id } => {
            let path = format!("/clusters/{}/georeplication", encode_segment(&cluster_id));
            return client.send_json(Method::GET, &path, None).await;
        }
        GeorepCmd::Create {
            session,
            option,
            ssh_port,
        } => {
            let mut request = session_request(GeoReplicationAction::Create, &session)
                .with_param("option", option.as_str());
            if let Some(port) = ssh_port {
                request = request.with_ssh_port(port);
            }
            (session.volume_id, request)
        }
        GeorepCmd::Config { session, set } => {
            let mut request = session_request(GeoReplicationAction::Config, &session);
            for kv in &set {
                let (key, value) = parse_param(kv)?;
                request = request.with_param(key, value);
            }
            (session.volume_id, request)
        }
        GeorepCmd::Start { session } => lifecycle(GeoReplicationAction::Start, session),
        GeorepCmd::Stop { session } => lifecycle(GeoReplicationAction::Stop, session),
        GeorepCmd::Pause { session } => lifecycle(GeoReplicationAction::Pause, session),
        GeorepCmd::Resume { session } => lifecycle(GeoReplicationAction::Resume, session),
        GeorepCmd::Delete { session } => lifecycle(GeoReplicationAction::Delete, session),
    };

    let body = serde_json::to_value(&request).context("Failed to encode request")?;
    client
        .send_async(Method::POST, &volume_georep_path(&volume_id), Some(body))
        .await
}

fn lifecycle(action: GeoReplicationAction, session: SessionArgs) -> (String, GeoReplicationRequest) {
    let request = session_request(action, &session);
    (session.volume_id, request)
}

fn session_request(action: GeoReplicationAction, session: &SessionArgs) -> GeoReplicationRequest {
    GeoReplicationRequest::new(action, &session.slave_host, &session.slave_volume)
        .with_force(session.force)
}

fn volume_georep_path(volume_id: &str) -> String {
    format!("/volumes/{}/georeplication", encode_segment(volume_id))
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

fn parse_param(s: &str) -> Result<(&str, &str)> {
    let (key, value) = s
        .split_once('=')
        .with_context(|| format!("Option must be KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Option key must not be empty in '{}'", s);
    }
    Ok((key, value.trim()))
}
