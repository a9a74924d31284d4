//! FoodDash admin MCP Server
//!
//! This MCP server lets platform operators drive the back-office moderation
//! engine from an MCP client. It handles authentication via environment
//! variables and exposes tools for:
//! - Browsing and searching restaurants, riders, orders and users
//! - Approving, rejecting, suspending and banning accounts
//! - Cancelling and refunding orders
//! - Summary counts

mod server;
mod session;

use anyhow::Result;
use rmcp::ServiceExt;
use server::FoodDashServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is used for MCP protocol)
    fooddash_engine::logging::init_stderr();

    tracing::info!("Starting FoodDash admin MCP server");

    let server = FoodDashServer::from_env().await?;

    // Serve over stdio - pass as tuple (stdin, stdout)
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = server.serve(transport).await?;

    // Wait for shutdown
    service.waiting().await?;

    Ok(())
}
