use serde_json::json;

use crate::models::{Action, DriverStats, ReplyEnvelope};

pub fn toll_tax_count(stats: &DriverStats) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::TollTaxCount,
        format!("Aaj aapne {} toll tax booth cross kiye hain.", stats.tolls_today),
    )
    .with_data(json!({ "tollsToday": stats.tolls_today }))
}

pub fn fuel_price(stats: &DriverStats, city: Option<&str>, default_city: &str) -> ReplyEnvelope {
    let known = city.and_then(|c| stats.fuel_price(c));
    let Some((name, price)) = known.or_else(|| stats.fuel_price(default_city)) else {
        return ReplyEnvelope::new(
            Action::FuelPriceQuery,
            "Abhi mere paas petrol ke daam ki jaankari nahi hai.",
        );
    };

    let mut reply = format!("{name} mein petrol ka daam ₹{price:.2} per liter hai.");
    if let (Some(asked), None) = (city, known) {
        reply = format!("{asked} ka rate mere paas nahi hai. {reply}");
    }

    ReplyEnvelope::new(Action::FuelPriceQuery, reply)
        .with_data(json!({ "city": name, "price": price }))
}

pub fn trip_count(stats: &DriverStats) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::TripCountToday,
        format!("Aaj aapne {} trips complete kiye hain.", stats.trips_today),
    )
    .with_data(json!({ "tripsToday": stats.trips_today }))
}

pub fn fuel_burnt(stats: &DriverStats) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::FuelBurntToday,
        format!(
            "Aaj aapne lagbhag {} liter fuel burn kiya hai.",
            stats.fuel_burnt_today
        ),
    )
    .with_data(json!({ "fuelBurntToday": stats.fuel_burnt_today }))
}

pub fn total_earning(stats: &DriverStats) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::TotalEarningToday,
        format!("Aaj ki kul kamai ₹{} hai.", stats.total_earning_today),
    )
    .with_data(json!({ "totalEarningToday": stats.total_earning_today }))
}

pub fn net_earning(stats: &DriverStats) -> ReplyEnvelope {
    ReplyEnvelope::new(
        Action::NetEarningToday,
        format!("Aaj ki net kamai ₹{} hai.", stats.net_earning_today),
    )
    .with_data(json!({ "netEarningToday": stats.net_earning_today }))
}
