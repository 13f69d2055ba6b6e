//! # contentlake-mcp
//!
//! MCP (Model Context Protocol) server for schema-governed JSON document
//! datasets.
//!
//! This crate exposes path parsing, schema validation, patch building and
//! atomic transactions over a document store as tools for AI agents. It
//! implements the MCP protocol over stdin/stdout using JSON-RPC 2.0.
//!
//! ## Features
//!
//! - **Field paths**: `body[_key=="a1"].children[0].text` parsed into typed segments
//! - **Schemas**: runtime type manifests compiled into validators, cycles included
//! - **Patches**: set/setIfMissing/unset/inc/dec/insert/diffMatchPatch in a fixed order
//! - **Transactions**: validated locally, committed atomically, with optional
//!   revision guards
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "content": {
//!       "command": "/path/to/contentlake-mcp",
//!       "args": ["--dataset", "production", "--seed", "/path/to/seed.json"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, you can use the library API:
//!
//! ```no_run
//! use std::sync::Arc;
//! use contentlake_mcp::{DatasetRef, McpServer, McpSession, MemoryStore};
//!
//! # async fn run() -> contentlake_mcp::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let session = McpSession::in_memory(store, DatasetRef::new("local", "production"));
//! let mut server = McpServer::new(session);
//!
//! // Run the server (reads from stdin, writes to stdout)
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod convert;
mod error;
pub mod mutation;
pub mod patch;
pub mod path;
pub mod schema;
mod server;
mod session;
pub mod store;
mod tools;

pub use error::{McpError, Result};
pub use mutation::{Transaction, TransactionOptions, TransactionResult, Visibility};
pub use patch::{PatchBuilder, PatchSpec, PatchUnit};
pub use path::{PathAddress, PathSegment, PathSyntaxError};
pub use schema::{CompiledSchema, SchemaConfigError, TypeManifest, ValidationError};
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer};
pub use session::McpSession;
pub use store::{DatasetRef, ManifestSource, MemoryStore, StoreClient, StoreError};
pub use tools::{ToolDef, ToolRegistry};
