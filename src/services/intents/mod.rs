pub mod orders;
pub mod reminder;
pub mod stats;

use chrono::NaiveDateTime;

use crate::models::{Intent, ReplyEnvelope};
use crate::services::nlu::Classification;
use crate::state::AppState;

pub struct Turn<'a> {
    pub state: &'a AppState,
    pub user_id: &'a str,
    pub text: &'a str,
    pub now: NaiveDateTime,
}

pub async fn dispatch(turn: &Turn<'_>, c: &Classification) -> anyhow::Result<ReplyEnvelope> {
    let e = &c.entities;
    match c.intent {
        Intent::CreateOrder => orders::create_order(turn, e).await,
        Intent::TrackOrder => orders::track_order(turn, e).await,
        Intent::UpdateOrder => orders::update_order(turn, e).await,
        Intent::CancelOrder => orders::cancel_order(turn, e).await,
        Intent::DeleteOrder => orders::delete_order(turn, e).await,
        Intent::UpdateAddress => orders::update_address(turn, e).await,
        Intent::NextPickup => orders::next_pickup(turn).await,
        Intent::ListOrders => orders::list_orders(turn).await,
        Intent::TollTaxCount => Ok(stats::toll_tax_count(&turn.state.stats)),
        Intent::FuelPriceQuery => Ok(stats::fuel_price(
            &turn.state.stats,
            e.location.as_deref(),
            &turn.state.config.default_city,
        )),
        Intent::TripCountToday => Ok(stats::trip_count(&turn.state.stats)),
        Intent::FuelBurntToday => Ok(stats::fuel_burnt(&turn.state.stats)),
        Intent::TotalEarningToday => Ok(stats::total_earning(&turn.state.stats)),
        Intent::NetEarningToday => Ok(stats::net_earning(&turn.state.stats)),
        Intent::Reminder => Ok(reminder::set_reminder(turn.text, turn.now)),
        Intent::General => anyhow::bail!("general intent has no rule-based handler"),
    }
}
