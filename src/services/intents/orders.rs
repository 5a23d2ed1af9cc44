use chrono::Utc;
use serde_json::json;

use crate::models::{
    generate_tracking_id, Action, EntitySet, NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate,
    ReplyEnvelope,
};
use crate::services::ai::extract::extract_order_fields;
use crate::services::ai::RetryPolicy;
use crate::services::nlu::entities;

use super::Turn;

const UPDATE_MENU: &str = "What would you like to update? (status, pickup time, assignee, items)";

fn ask_for_order_id(verb: &str, example: &str) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::AskForOrderId,
        format!("Please provide the order ID to {verb} (e.g., '{example} ORD-ABC123')."),
    )
}

fn not_found(tracking_id: &str) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::OrderNotFound,
        format!("I couldn't find order {tracking_id}."),
    )
    .with_tracking_id(tracking_id)
}

fn describe_pickup(order: &Order) -> String {
    order
        .pickup_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "not set".to_string())
}

pub async fn create_order(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let state = turn.state;
    let fields = extract_order_fields(
        state.llm.as_deref(),
        turn.text,
        RetryPolicy::from_config(&state.config),
    )
    .await;

    let pickup_time = fields.pickup_time.or(e.pickup_time);

    let order = state
        .orders
        .create(NewOrder {
            tracking_id: generate_tracking_id(Utc::now().timestamp_millis()),
            customer_name: fields.customer_name,
            address: fields.address,
            item: fields.item,
            qty: fields.qty,
            status: OrderStatus::Created,
            pickup_time,
            assigned_to: None,
            metadata: Some(json!({ "createdBy": turn.user_id, "createdVia": "voice" })),
        })
        .await?;

    tracing::info!(tracking_id = %order.tracking_id, user_id = turn.user_id, "order created");

    Ok(ReplyEnvelope::new(
        Action::CreatedOrder,
        format!("Order created. Tracking ID {}.", order.tracking_id),
    )
    .with_order(order))
}

pub async fn track_order(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let Some(tracking_id) = e.tracking_id.as_deref() else {
        return Ok(ask_for_order_id("track", "Track order"));
    };
    let Some(order) = turn.state.orders.find_by_tracking_id(tracking_id).await? else {
        return Ok(not_found(tracking_id));
    };

    let reply = format!(
        "Here are the details for {}:\n- Customer: {}\n- Items: {} ({})\n- Address: {}\n- Status: {}\n- Pickup time: {}",
        order.tracking_id,
        order.customer_name.as_deref().unwrap_or("N/A"),
        order.item,
        order.qty,
        order.address.as_deref().unwrap_or("N/A"),
        order.status,
        describe_pickup(&order),
    );
    Ok(ReplyEnvelope::new(Action::TrackOrder, reply).with_order(order))
}

pub async fn update_order(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let Some(tracking_id) = e.tracking_id.as_deref() else {
        return Ok(ask_for_order_id("update", "Update order"));
    };
    let Some(order) = turn.state.orders.find_by_tracking_id(tracking_id).await? else {
        return Ok(not_found(tracking_id));
    };

    if entities::mentions_assign(turn.text) && e.assignee_name.is_none() {
        return Ok(ReplyEnvelope::new(
            Action::AskForAssignee,
            format!("Who should I assign order {tracking_id} to?"),
        )
        .with_tracking_id(tracking_id));
    }

    let mut update = OrderUpdate {
        status: e.status,
        assigned_to: e.assignee_name.clone(),
        pickup_time: e.pickup_time,
        ..Default::default()
    };
    if !e.item_delta.is_empty() {
        update.item = Some(entities::apply_item_delta(&order.item, &e.item_delta));
    }

    if update.is_empty() {
        return Ok(ReplyEnvelope::new(Action::AskForUpdateFields, UPDATE_MENU)
            .with_tracking_id(tracking_id));
    }

    let Some(updated) = turn.state.orders.apply_update(&order.id, &update).await? else {
        return Ok(not_found(tracking_id));
    };

    let reply = format!(
        "Order {} updated.\n- Status: {}\n- Pickup time: {}\n- Assigned to: {}\n- Items: {}",
        updated.tracking_id,
        updated.status,
        describe_pickup(&updated),
        updated.assigned_to.as_deref().unwrap_or("unassigned"),
        updated.item,
    );
    Ok(ReplyEnvelope::new(Action::UpdateOrder, reply).with_order(updated))
}

pub async fn cancel_order(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let Some(tracking_id) = e.tracking_id.as_deref() else {
        return Ok(ask_for_order_id("cancel", "Cancel order"));
    };
    let Some(order) = turn.state.orders.find_by_tracking_id(tracking_id).await? else {
        return Ok(not_found(tracking_id));
    };

    let update = OrderUpdate {
        status: Some(OrderStatus::Cancelled),
        ..Default::default()
    };
    let Some(cancelled) = turn.state.orders.apply_update(&order.id, &update).await? else {
        return Ok(not_found(tracking_id));
    };

    Ok(ReplyEnvelope::new(
        Action::CancelOrder,
        format!("Order {} cancelled.", cancelled.tracking_id),
    )
    .with_order(cancelled))
}

pub async fn delete_order(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let Some(tracking_id) = e.tracking_id.as_deref() else {
        return Ok(ask_for_order_id("delete", "Delete order"));
    };
    let Some(order) = turn.state.orders.find_by_tracking_id(tracking_id).await? else {
        return Ok(not_found(tracking_id));
    };

    if !turn.state.orders.delete(&order.id).await? {
        return Ok(not_found(tracking_id));
    }

    tracing::info!(tracking_id, user_id = turn.user_id, "order deleted");
    Ok(ReplyEnvelope::new(
        Action::DeleteOrder,
        format!("Order {tracking_id} has been deleted."),
    )
    .with_tracking_id(tracking_id))
}

pub async fn update_address(turn: &Turn<'_>, e: &EntitySet) -> anyhow::Result<ReplyEnvelope> {
    let Some(tracking_id) = e.tracking_id.as_deref() else {
        return Ok(ask_for_order_id("update the address", "Update address of order"));
    };
    let Some(order) = turn.state.orders.find_by_tracking_id(tracking_id).await? else {
        return Ok(not_found(tracking_id));
    };
    let Some(address) = entities::extract_address_after_id(turn.text) else {
        return Ok(ReplyEnvelope::new(
            Action::AskForAddress,
            format!("What is the new address for order {tracking_id}?"),
        )
        .with_tracking_id(tracking_id));
    };

    let update = OrderUpdate {
        address: Some(address),
        ..Default::default()
    };
    let Some(updated) = turn.state.orders.apply_update(&order.id, &update).await? else {
        return Ok(not_found(tracking_id));
    };

    let reply = format!(
        "The address for order {} has been updated to: {}",
        updated.tracking_id,
        updated.address.as_deref().unwrap_or_default(),
    );
    Ok(ReplyEnvelope::new(Action::UpdateAddress, reply).with_order(updated))
}

pub async fn next_pickup(turn: &Turn<'_>) -> anyhow::Result<ReplyEnvelope> {
    let Some(order) = turn.state.orders.next_pending_pickup().await? else {
        return Ok(ReplyEnvelope::new(
            Action::NoPickups,
            "You have no upcoming pickups.",
        ));
    };

    let mut reply = format!("Next pickup: {} ({})", order.item, order.qty);
    if let Some(address) = &order.address {
        reply.push_str(&format!(" at {address}"));
    }
    if let Some(t) = order.pickup_time {
        reply.push_str(&format!(", {}", t.format("%Y-%m-%d %H:%M")));
    }
    reply.push_str(&format!(". Tracking ID {}.", order.tracking_id));

    Ok(ReplyEnvelope::new(Action::NextPickup, reply).with_order(order))
}

pub async fn list_orders(turn: &Turn<'_>) -> anyhow::Result<ReplyEnvelope> {
    let orders = turn
        .state
        .orders
        .recent(&OrderFilter::default(), turn.state.config.order_list_limit)
        .await?;

    let reply = if orders.is_empty() {
        "No orders found.".to_string()
    } else {
        format!("Showing your {} most recent orders.", orders.len())
    };
    Ok(ReplyEnvelope::new(Action::ListOrders, reply).with_orders(orders))
}
