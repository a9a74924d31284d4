//! FoodDash operator MCP server implementation
//!
//! Exposes the moderation engine as tools: list and filter records, read
//! summary counts, read the audit trail, and approve/reject/suspend/verify/
//! ban/cancel/refund.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::session::Session;
use anyhow::Result;
use fooddash_engine::app::{FlagPartition, StatusCounts};
use fooddash_engine::domain::entities::{Entity, Lifecycle, VERIFIED_FLAG};
use fooddash_engine::{
    AccountStatus, AuditEntry, AuditQuery, Config, EntityId, EntityKind, ModerationError,
    OrderStatus, StatusFilter, ViewQuery,
};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{
    handler::server::tool::ToolRouter,
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;

/// FoodDash MCP Server
///
/// Provides back-office moderation tools for platform operators.
#[derive(Clone)]
pub struct FoodDashServer {
    session: Arc<Session>,
    tool_router: ToolRouter<Self>,
}

impl FoodDashServer {
    pub async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        let session = Session::connect(&config).await?;
        Ok(Self::new(session))
    }

    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            tool_router: Self::tool_router(),
        }
    }
}

// --- Tool Parameter Types ---

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEntitiesParams {
    /// Entity kind: "restaurant", "rider", "order", or "user"
    pub kind: String,
    /// Status filter: "all" (default) or an exact status such as "pending"
    #[serde(default)]
    pub status: Option<String>,
    /// Case-insensitive search over name/email (orders: order number/customer)
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KindParams {
    /// Entity kind: "restaurant", "rider", "order", or "user"
    pub kind: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AccountParams {
    /// Account kind: "restaurant", "rider", or "user"
    pub kind: String,
    /// Record id
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RejectParams {
    /// Account kind: "restaurant", "rider", or "user"
    pub kind: String,
    /// Record id
    pub id: String,
    /// Why the application is rejected (required, kept for audit)
    pub reason: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IdParams {
    /// Record id
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReasonParams {
    /// Record id
    pub id: String,
    /// Reason recorded for audit (required)
    pub reason: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefundParams {
    /// Order id
    pub id: String,
    /// Amount to refund; must be positive and at most the order total
    pub amount: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AuditLogParams {
    /// Only entries about this kind: "restaurant", "rider", "order", or "user"
    #[serde(default)]
    pub kind: Option<String>,
    /// Only entries about this record id
    #[serde(default)]
    pub id: Option<String>,
    /// Maximum number of entries (default 50)
    #[serde(default)]
    pub limit: Option<u32>,
}

const DEFAULT_AUDIT_LIMIT: u32 = 50;

fn respond(result: Result<String, ModerationError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
    }
}

fn parse_kind(raw: &str) -> Result<EntityKind, ModerationError> {
    raw.parse().map_err(ModerationError::InvalidInput)
}

fn parse_filter<S: Lifecycle>(raw: Option<&str>) -> Result<StatusFilter<S>, ModerationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(StatusFilter::All),
        Some(raw) => raw.parse().map_err(ModerationError::InvalidInput),
    }
}

/// One line per record: id, label, status, then the display fields
fn render_rows<S: Lifecycle>(kind: EntityKind, rows: &[Entity<S>]) -> String {
    if rows.is_empty() {
        return format!("No {} match.", kind.plural());
    }
    let mut out = format!("{} {}:\n", rows.len(), kind.plural());
    for row in rows {
        let _ = write!(out, "- [{}] {} ({})", row.id, row.label(), row.status);
        for (name, value) in &row.display_fields {
            if name != "name" && name != "order_number" {
                let _ = write!(out, " {}={}", name, value);
            }
        }
        if let Some(reason) = &row.reason {
            let _ = write!(out, " reason={}", reason);
        }
        out.push('\n');
    }
    out
}

fn render_counts<S: Lifecycle>(kind: EntityKind, counts: &StatusCounts<S>) -> String {
    let mut out = format!("{} {} total\n", counts.total, kind.plural());
    for (status, n) in &counts.by_status {
        let _ = writeln!(out, "- {}: {}", status, n);
    }
    out
}

fn render_partition(label: &str, partition: FlagPartition) -> String {
    format!("- {}: {} yes / {} no\n", label, partition.set, partition.unset)
}

fn audit_query(params: &AuditLogParams) -> Result<AuditQuery, ModerationError> {
    let entity_type = params.kind.as_deref().map(parse_kind).transpose()?;
    let entity_id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(EntityId::from);
    Ok(AuditQuery {
        entity_type,
        entity_id,
        limit: Some(params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)),
    })
}

fn render_audit(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No audit entries.".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "- {} {}", entry.created_at.format("%Y-%m-%d %H:%M"), entry.action);
        if let (Some(kind), Some(id)) = (entry.entity_kind, &entry.entity_id) {
            let _ = write!(out, " {} {}", kind, id);
        }
        if let Some(actor) = &entry.actor {
            let _ = write!(out, " by {}", actor);
        }
        if let Some(reason) = &entry.reason {
            let _ = write!(out, " reason={}", reason);
        }
        out.push('\n');
    }
    out
}

fn changed<S: Lifecycle>(entity: &Entity<S>) -> String {
    format!("{} {} is now {}", entity.kind, entity.label(), entity.status)
}

impl FoodDashServer {
    async fn list_accounts(
        &self,
        kind: EntityKind,
        params: &ListEntitiesParams,
    ) -> Result<String, ModerationError> {
        let engine = self.session.accounts(kind)?;
        let filter = parse_filter::<AccountStatus>(params.status.as_deref())?;
        engine.load(filter).await?;
        let rows = engine.view(
            &ViewQuery::all()
                .with_status(filter)
                .with_search(params.search.clone().unwrap_or_default()),
        );
        Ok(render_rows(kind, &rows))
    }

    async fn list_orders(&self, params: &ListEntitiesParams) -> Result<String, ModerationError> {
        let engine = self.session.orders();
        let filter = parse_filter::<OrderStatus>(params.status.as_deref())?;
        engine.load(filter).await?;
        let rows = engine.view(
            &ViewQuery::all()
                .with_status(filter)
                .with_search(params.search.clone().unwrap_or_default()),
        );
        Ok(render_rows(EntityKind::Order, &rows))
    }

    async fn kind_stats(&self, kind: EntityKind) -> Result<String, ModerationError> {
        if kind == EntityKind::Order {
            let engine = self.session.orders();
            engine.load(StatusFilter::All).await?;
            let mut out = render_counts(kind, &engine.stats());
            let _ = writeln!(out, "- revenue: {:.2}", engine.sum_metric("total"));
            return Ok(out);
        }

        let engine = self.session.accounts(kind)?;
        engine.load(StatusFilter::All).await?;
        let mut out = render_counts(kind, &engine.stats());
        if kind == EntityKind::Rider {
            out.push_str(&render_partition("online", engine.partition("is_online")));
            out.push_str(&render_partition("verified", engine.partition(VERIFIED_FLAG)));
        }
        Ok(out)
    }
}

#[tool_router]
impl FoodDashServer {
    // === Browsing ===

    #[tool(
        description = "List restaurants, riders, orders or users, optionally filtered by status and a search term. Call this first."
    )]
    async fn list(&self, params: Parameters<ListEntitiesParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = match parse_kind(&params.kind) {
            Ok(EntityKind::Order) => self.list_orders(&params).await,
            Ok(kind) => self.list_accounts(kind, &params).await,
            Err(e) => Err(e),
        };
        respond(result)
    }

    #[tool(description = "Count records of a kind per status (riders also online and verified, orders also revenue).")]
    async fn stats(&self, params: Parameters<KindParams>) -> Result<CallToolResult, McpError> {
        let result = match parse_kind(&params.0.kind) {
            Ok(kind) => self.kind_stats(kind).await,
            Err(e) => Err(e),
        };
        respond(result)
    }

    #[tool(description = "Platform-wide dashboard counters computed by the backend.")]
    async fn dashboard(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .session
            .orders()
            .dashboard_stats()
            .await
            .and_then(|stats| {
                serde_json::to_string_pretty(&stats)
                    .map_err(|e| ModerationError::Collaborator(e.to_string()))
            });
        respond(result)
    }

    #[tool(description = "Recent operator actions recorded by the backend, newest first. Optionally narrowed to one kind or record.")]
    async fn audit_log(&self, params: Parameters<AuditLogParams>) -> Result<CallToolResult, McpError> {
        let result = async {
            let query = audit_query(&params.0)?;
            let entries = self.session.orders().audit_log(&query).await?;
            Ok::<_, ModerationError>(render_audit(&entries))
        }
        .await;
        respond(result)
    }

    // === Account Moderation ===

    #[tool(description = "Approve a pending restaurant, rider or user.")]
    async fn approve(&self, params: Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = async {
            let engine = self.session.accounts(parse_kind(&params.kind)?)?;
            engine.approve(&EntityId::from(params.id)).await.map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Reject a pending restaurant, rider or user. A reason is required.")]
    async fn reject(&self, params: Parameters<RejectParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = async {
            let engine = self.session.accounts(parse_kind(&params.kind)?)?;
            engine
                .reject(&EntityId::from(params.id), &params.reason)
                .await
                .map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Suspend an approved restaurant or rider.")]
    async fn suspend(&self, params: Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = async {
            let engine = self.session.accounts(parse_kind(&params.kind)?)?;
            engine.suspend(&EntityId::from(params.id)).await.map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Reinstate a suspended restaurant or rider.")]
    async fn reinstate(&self, params: Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = async {
            let engine = self.session.accounts(parse_kind(&params.kind)?)?;
            engine.reinstate(&EntityId::from(params.id)).await.map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Mark a rider's documents as verified. The rider's status does not change.")]
    async fn verify_rider(&self, params: Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = async {
            let engine = self.session.accounts(EntityKind::Rider)?;
            let rider = engine.verify(&EntityId::from(params.0.id)).await?;
            Ok::<_, ModerationError>(format!("rider {} is now verified", rider.label()))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Ban an approved customer account. A reason is required.")]
    async fn ban_user(&self, params: Parameters<ReasonParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = async {
            let engine = self.session.accounts(EntityKind::User)?;
            engine
                .ban(&EntityId::from(params.id), &params.reason)
                .await
                .map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Lift the ban on a customer account.")]
    async fn unban_user(&self, params: Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = async {
            let engine = self.session.accounts(EntityKind::User)?;
            engine.unban(&EntityId::from(params.0.id)).await.map(|e| changed(&e))
        }
        .await;
        respond(result)
    }

    #[tool(description = "Permanently delete a customer account.")]
    async fn remove_user(&self, params: Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let id = EntityId::from(params.0.id);
        let result = async {
            self.session.accounts(EntityKind::User)?.remove(&id).await?;
            Ok::<_, ModerationError>(format!("user {} removed", id))
        }
        .await;
        respond(result)
    }

    // === Orders ===

    #[tool(description = "Cancel an order that is not yet delivered. A reason is required.")]
    async fn cancel_order(&self, params: Parameters<ReasonParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = self
            .session
            .orders()
            .cancel(&EntityId::from(params.id), &params.reason)
            .await
            .map(|e| changed(&e));
        respond(result)
    }

    #[tool(description = "Refund part or all of a delivered or cancelled order.")]
    async fn refund_order(&self, params: Parameters<RefundParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = self
            .session
            .orders()
            .refund(&EntityId::from(params.id), params.amount)
            .await
            .map(|order| {
                format!(
                    "refunded {:.2} of {:.2} on order {} ({})",
                    params.amount,
                    order.total(),
                    order.label(),
                    order.status
                )
            });
        respond(result)
    }
}

#[tool_handler]
impl ServerHandler for FoodDashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "fooddash-admin".into(),
                title: Some("FoodDash Admin MCP Server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                r#"FoodDash back-office moderation

SETUP: Set ADMIN_API_URL and either ADMIN_TOKEN or ADMIN_EMAIL/ADMIN_PASSWORD.

WORKFLOW:
1. 'list' - Browse a kind, filter by status ("pending" for the review queue)
2. 'approve' / 'reject' - Decide pending restaurants, riders and users
3. 'suspend' / 'reinstate' - Toggle approved restaurants and riders
4. 'verify_rider' - Mark a rider's documents as checked
5. 'ban_user' / 'unban_user' / 'remove_user' - Customer accounts
6. 'cancel_order' / 'refund_order' - Order interventions
7. 'stats' / 'dashboard' - Summary counts
8. 'audit_log' - Who did what, and why

RULES:
- Accounts: pending -> approved | rejected; approved <-> suspended; rejected is final
- Orders: pending -> preparing -> ready -> picked_up -> delivered; cancel any time before delivery
- Refunds only on delivered or cancelled orders, up to the order total
- Reject, ban and cancel need a reason"#
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fooddash_engine::domain::entities::EntitySnapshot;

    fn restaurant(id: &str, name: &str, status: &str) -> Entity<AccountStatus> {
        Entity::from_snapshot(
            EntitySnapshot::new(EntityKind::Restaurant, id, status)
                .with_field("name", name)
                .with_field("email", "contact@pizzaparadise.com"),
        )
        .unwrap()
    }

    #[test]
    fn test_list_params_deserialize() {
        let json = r#"{"kind": "restaurant", "status": "pending", "search": "pizza"}"#;
        let params: ListEntitiesParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.kind, "restaurant");
        assert_eq!(params.status.as_deref(), Some("pending"));
        assert_eq!(params.search.as_deref(), Some("pizza"));
    }

    #[test]
    fn test_list_params_defaults() {
        let params: ListEntitiesParams = serde_json::from_str(r#"{"kind": "orders"}"#).unwrap();
        assert_eq!(params.status, None);
        assert_eq!(params.search, None);
    }

    #[test]
    fn test_reject_params_deserialize() {
        let json = r#"{"kind": "rider", "id": "7", "reason": "Expired license"}"#;
        let params: RejectParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.kind, "rider");
        assert_eq!(params.id, "7");
        assert_eq!(params.reason, "Expired license");
    }

    #[test]
    fn test_refund_params_deserialize() {
        let params: RefundParams = serde_json::from_str(r#"{"id": "1", "amount": 12.5}"#).unwrap();
        assert_eq!(params.id, "1");
        assert_eq!(params.amount, 12.5);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("Riders").unwrap(), EntityKind::Rider);
        assert!(matches!(parse_kind("drivers"), Err(ModerationError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter::<AccountStatus>(None).unwrap(), StatusFilter::All);
        assert_eq!(parse_filter::<AccountStatus>(Some("  ")).unwrap(), StatusFilter::All);
        assert_eq!(
            parse_filter::<OrderStatus>(Some("picked_up")).unwrap(),
            StatusFilter::Only(OrderStatus::PickedUp)
        );
        assert!(parse_filter::<AccountStatus>(Some("Approved")).is_err());
    }

    #[test]
    fn test_render_rows() {
        let rows = vec![
            restaurant("1", "Pizza Paradise", "approved"),
            restaurant("2", "Sushi Master", "pending"),
        ];
        let text = render_rows(EntityKind::Restaurant, &rows);
        assert!(text.starts_with("2 restaurants:"));
        assert!(text.contains("- [1] Pizza Paradise (approved) email=contact@pizzaparadise.com"));
        assert!(text.contains("- [2] Sushi Master (pending)"));

        assert_eq!(render_rows::<AccountStatus>(EntityKind::Rider, &[]), "No riders match.");
    }

    #[test]
    fn test_changed_message() {
        let entity = restaurant("2", "Sushi Master", "approved");
        assert_eq!(changed(&entity), "restaurant Sushi Master is now approved");
    }

    #[test]
    fn test_audit_query_from_params() {
        let params: AuditLogParams =
            serde_json::from_str(r#"{"kind": "riders", "id": " 7 "}"#).unwrap();
        let query = audit_query(&params).unwrap();
        assert_eq!(query.entity_type, Some(EntityKind::Rider));
        assert_eq!(query.entity_id, Some(EntityId::from("7")));
        assert_eq!(query.limit, Some(DEFAULT_AUDIT_LIMIT));

        let params: AuditLogParams = serde_json::from_str(r#"{"kind": "drivers"}"#).unwrap();
        assert!(audit_query(&params).is_err());
    }

    #[test]
    fn test_render_audit() {
        let mut entry = AuditEntry::new("31", "reject")
            .on(EntityKind::Restaurant, "2")
            .with_reason("Missing license");
        entry.actor = Some("admin@fooddash.com".to_string());
        entry.created_at = chrono::DateTime::parse_from_rfc3339("2024-03-10T14:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        assert_eq!(
            render_audit(&[entry]),
            "- 2024-03-10 14:30 reject restaurant 2 by admin@fooddash.com reason=Missing license\n"
        );
        assert_eq!(render_audit(&[]), "No audit entries.");
    }
}
