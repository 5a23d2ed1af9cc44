use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStats {
    pub tolls_today: u32,
    pub trips_today: u32,
    pub fuel_burnt_today: f64,
    pub total_earning_today: i64,
    pub net_earning_today: i64,
    pub city_fuel_prices: BTreeMap<String, f64>,
}

impl Default for DriverStats {
    fn default() -> Self {
        let city_fuel_prices = [
            ("Bengaluru", 110.5),
            ("Mumbai", 115.2),
            ("Delhi", 105.8),
            ("Kolkata", 108.3),
        ]
        .into_iter()
        .map(|(city, price)| (city.to_string(), price))
        .collect();

        Self {
            tolls_today: 3,
            trips_today: 7,
            fuel_burnt_today: 8.2,
            total_earning_today: 1850,
            net_earning_today: 1500,
            city_fuel_prices,
        }
    }
}

impl DriverStats {
    pub fn fuel_price(&self, city: &str) -> Option<(&str, f64)> {
        self.city_fuel_prices
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(city))
            .map(|(name, price)| (name.as_str(), *price))
    }
}
