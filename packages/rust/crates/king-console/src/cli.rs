use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use king_types::{FilterPredicate, Scheme};

#[derive(Parser)]
#[command(name = "king-console")]
#[command(about = "Weaviate-King data access: connections, schema and object pages as JSON.")]
pub(crate) struct Cli {
    /// Override config directory (settings at `<conf>/weaviate-king/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Collaborator base URL (overrides settings and `KING_BACKEND_URL`).
    #[arg(long, global = true)]
    pub(crate) backend_url: Option<String>,

    /// Debug logging on stderr (ignored when `RUST_LOG` is set).
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Which cluster to talk to: a saved connection or explicit fields.
#[derive(Args, Debug, Clone)]
pub(crate) struct ConnectionArgs {
    /// Saved connection id, resolved through the collaborator
    #[arg(long, conflicts_with = "address")]
    pub(crate) connection_id: Option<String>,

    /// Cluster `host:port`
    #[arg(long)]
    pub(crate) address: Option<String>,

    /// `http` or `https`
    #[arg(long, default_value = "http")]
    pub(crate) scheme: Scheme,

    /// Cluster API key
    #[arg(long)]
    pub(crate) api_key: Option<String>,

    /// Display name sent with requests
    #[arg(long, default_value = "")]
    pub(crate) name: String,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List saved connections.
    Connections,
    /// Show one saved connection.
    Connection {
        /// Connection id
        id: String,
    },
    /// Probe readiness, meta and schema access of a cluster.
    TestConnection {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// List classes of a cluster.
    Classes {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Property names of a class (filter selector order).
    Properties {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Target class
        #[arg(long = "class")]
        class_name: String,
    },
    /// Fetch object pages of a class.
    Objects {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Target class
        #[arg(long = "class")]
        class_name: String,

        /// Predicate `property:Operator:value` (Equal or Like); repeatable
        #[arg(long = "filter")]
        filters: Vec<FilterPredicate>,

        /// How predicates combine: `and` or `or`
        #[arg(long, default_value = "and")]
        logic: String,

        /// Listing pages to walk while the cursor continues
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Only print records of the last page matching this text
        #[arg(long)]
        search: Option<String>,

        /// Only print the rows of this display page (1-based)
        #[arg(long)]
        display_page: Option<usize>,

        /// Print the raw payload of this object id from the last page
        #[arg(long, conflicts_with_all = ["search", "display_page"])]
        raw: Option<String>,
    },
}
