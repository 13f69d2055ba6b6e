//! MCP server for schema-governed document datasets.
//!
//! Run with `contentlake-mcp --seed seed.json` to serve an in-memory dataset.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use contentlake_mcp::{DatasetRef, McpServer, McpSession, MemoryStore};

/// MCP server for schema-governed document datasets.
///
/// Exposes path, schema, patch and transaction operations as MCP tools for AI
/// agents. Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "contentlake-mcp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Project id.
    #[arg(long, env = "CONTENT_PROJECT_ID", default_value = "local")]
    project: String,

    /// Dataset to start in.
    #[arg(long, env = "CONTENT_DATASET", default_value = "production")]
    dataset: String,

    /// JSON seed file with `schema` manifests and `documents` for the
    /// starting dataset. Without it the dataset starts empty.
    #[arg(long, value_name = "PATH")]
    seed: Option<String>,

    /// Reject every write tool.
    #[arg(long)]
    read_only: bool,

    /// Enable debug logging to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // Set up logging; stdout is reserved for JSON-RPC
    let filter = if args.verbose {
        match "contentlake_mcp=debug".parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        }
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let dataset = DatasetRef::new(args.project, args.dataset);

    // Open the store
    let store = match &args.seed {
        Some(path) => match MemoryStore::from_seed_file(path, &dataset) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: Failed to load seed file '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => MemoryStore::new(),
    };

    // Create session and server
    let session = McpSession::in_memory(Arc::new(store), dataset).read_only(args.read_only);
    let mut server = McpServer::new(session);

    // Run the server
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
