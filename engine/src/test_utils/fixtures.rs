//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults, modelled
//! on the records the admin backend serves.

use chrono::{Duration, TimeZone, Utc};

use crate::domain::entities::{
    AccountStatus, Credential, Entity, EntityKind, EntitySnapshot, OrderStatus,
};

fn created_at(id: &str) -> chrono::DateTime<Utc> {
    let offset = id.bytes().map(i64::from).sum::<i64>();
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
        + Duration::minutes(offset)
}

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// A bearer credential with no expiry
pub fn test_credential() -> Credential {
    Credential::bearer("admin-token")
}

/// Restaurant snapshot with a raw status string
pub fn restaurant_snapshot(id: &str, name: &str, status: &str) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Restaurant, id, status)
        .with_field("name", name)
        .with_field("email", format!("contact@{}.com", slug(name)))
        .with_field("phone", "+15551234567")
        .with_field("address", "123 Main St, New York, NY")
        .with_field("cuisine_type", "Italian, Pizza")
        .with_metric("rating", 4.5)
        .with_metric("total_orders", 120.0)
        .with_metric("revenue", 2400.0)
        .with_flag("is_open", true)
        .with_created_at(created_at(id))
}

pub fn rider_snapshot(id: &str, name: &str, status: &str, online: bool) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Rider, id, status)
        .with_field("name", name)
        .with_field("email", format!("{}@riders.com", slug(name)))
        .with_field("phone", "+15559876543")
        .with_field("vehicle_type", "motorcycle")
        .with_metric("rating", 4.7)
        .with_metric("total_deliveries", 80.0)
        .with_metric("earnings", 50.0)
        .with_flag("is_online", online)
        .with_created_at(created_at(id))
}

pub fn user_snapshot(id: &str, name: &str, status: &str) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::User, id, status)
        .with_field("name", name)
        .with_field("email", format!("{}@example.com", slug(name)))
        .with_field("phone", "+15550001111")
        .with_metric("total_orders", 4.0)
        .with_created_at(created_at(id))
}

pub fn order_snapshot(
    id: &str,
    order_number: &str,
    customer_name: &str,
    status: &str,
    total: f64,
) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Order, id, status)
        .with_field("order_number", order_number)
        .with_field("customer_name", customer_name)
        .with_field("restaurant_name", "Pizza Paradise")
        .with_field("payment_method", "card")
        .with_metric("total", total)
        .with_metric("delivery_fee", 2.99)
        .with_created_at(created_at(id))
}

fn typed<S: crate::domain::entities::Lifecycle>(snapshot: EntitySnapshot) -> Entity<S> {
    Entity::from_snapshot(snapshot).expect("fixture status must parse")
}

/// Create a test restaurant with a specific status
pub fn test_restaurant(id: &str, name: &str, status: AccountStatus) -> Entity<AccountStatus> {
    typed(restaurant_snapshot(id, name, &status.to_string()))
}

pub fn test_rider(
    id: &str,
    name: &str,
    status: AccountStatus,
    online: bool,
) -> Entity<AccountStatus> {
    typed(rider_snapshot(id, name, &status.to_string(), online))
}

pub fn test_order(
    id: &str,
    order_number: &str,
    customer_name: &str,
    status: OrderStatus,
    total: f64,
) -> Entity<OrderStatus> {
    typed(order_snapshot(
        id,
        order_number,
        customer_name,
        &status.to_string(),
        total,
    ))
}
