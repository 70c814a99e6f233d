//! Market-related types for the premium exchange.

use std::ops::Index;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Tradeable resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
    /// Wood.
    Wood,
    /// Stone (clay).
    Stone,
    /// Iron.
    Iron,
}

impl Resource {
    /// All resources in scan order. Ties in price selection resolve to the
    /// earliest entry.
    pub const ALL: [Resource; 3] = [Resource::Wood, Resource::Stone, Resource::Iron];
}

/// One value per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerResource<T> {
    /// Wood value.
    pub wood: T,
    /// Stone value.
    pub stone: T,
    /// Iron value.
    pub iron: T,
}

impl<T> PerResource<T> {
    /// Create from the three values.
    pub fn new(wood: T, stone: T, iron: T) -> Self {
        Self { wood, stone, iron }
    }

    /// Get the value for a resource.
    pub fn get(&self, resource: Resource) -> &T {
        match resource {
            Resource::Wood => &self.wood,
            Resource::Stone => &self.stone,
            Resource::Iron => &self.iron,
        }
    }

    /// Get a mutable reference to the value for a resource.
    pub fn get_mut(&mut self, resource: Resource) -> &mut T {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Stone => &mut self.stone,
            Resource::Iron => &mut self.iron,
        }
    }

    /// Apply `f` to each value, in scan order.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerResource<U> {
        PerResource {
            wood: f(self.wood),
            stone: f(self.stone),
            iron: f(self.iron),
        }
    }

    /// Iterate `(resource, value)` pairs in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, &T)> {
        Resource::ALL.into_iter().map(move |r| (r, self.get(r)))
    }
}

impl<T> Index<Resource> for PerResource<T> {
    type Output = T;

    fn index(&self, resource: Resource) -> &T {
        self.get(resource)
    }
}

/// Integer amount that tolerates the game's habit of sending numbers as
/// strings or with a fractional part. Fractions are floored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct WholeAmount(pub i64);

impl<'de> Deserialize<'de> for WholeAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_i64().or_else(|| floor_to_i64(&n.to_string())),
            Value::String(s) => floor_to_i64(s.trim()),
            _ => None,
        };

        parsed
            .map(WholeAmount)
            .ok_or_else(|| de::Error::custom(format!("expected a whole amount, got {value}")))
    }
}

fn floor_to_i64(raw: &str) -> Option<i64> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()?
        .floor()
        .to_i64()
}

/// Exchange pricing constants, supplied fresh with every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConstants {
    /// Price of one unit at zero stock.
    pub resource_base_price: Decimal,
    /// How fast the price falls as stock grows.
    pub resource_price_elasticity: Decimal,
    /// Added to capacity in the price denominator.
    pub stock_size_modifier: Decimal,
}

/// Fractional exchange tax per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRates {
    /// Tax applied when buying.
    pub buy: Decimal,
    /// Tax applied when selling.
    pub sell: Decimal,
}

impl TaxRates {
    /// Tax for a signed unit count: buy tax for `units >= 0`, sell tax otherwise.
    pub fn for_units(&self, units: i64) -> Decimal {
        if units >= 0 {
            self.buy
        } else {
            self.sell
        }
    }
}

/// Player-side state refreshed by every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VillageState {
    /// Resources stored in the village.
    pub available: PerResource<i64>,
    /// Premium points held by the player.
    pub points: i64,
    /// Merchants currently at home.
    pub merchants: i64,
    /// CSRF token required by the mutating endpoints, once known.
    pub csrf: Option<String>,
}

/// Everything one poll of the exchange returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    /// Village and player state.
    pub village: VillageState,
    /// Pricing constants.
    pub constants: MarketConstants,
    /// Exchange stock per resource.
    pub stock: PerResource<i64>,
    /// Exchange capacity per resource.
    pub capacity: PerResource<i64>,
    /// Current tax rates.
    pub tax: TaxRates,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn resource_string_round_trip() {
        assert_eq!(Resource::Wood.to_string(), "wood");
        assert_eq!(Resource::from_str("iron").unwrap(), Resource::Iron);
        assert!(Resource::from_str("gold").is_err());
    }

    #[test]
    fn per_resource_indexes_and_maps_in_scan_order() {
        let stock = PerResource::new(1, 2, 3);
        assert_eq!(stock[Resource::Stone], 2);

        let mut seen = Vec::new();
        let doubled = stock.map(|v| {
            seen.push(v);
            v * 2
        });
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(doubled, PerResource::new(2, 4, 6));

        let order: Vec<Resource> = stock.iter().map(|(r, _)| r).collect();
        assert_eq!(order, Resource::ALL.to_vec());
    }

    #[test]
    fn whole_amount_accepts_game_number_formats() {
        let parsed: Vec<WholeAmount> =
            serde_json::from_str(r#"[123, "456", 78.9, "-12", -3.5]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                WholeAmount(123),
                WholeAmount(456),
                WholeAmount(78),
                WholeAmount(-12),
                WholeAmount(-4)
            ]
        );

        assert!(serde_json::from_str::<WholeAmount>("null").is_err());
        assert!(serde_json::from_str::<WholeAmount>(r#""lots""#).is_err());
    }

    #[test]
    fn tax_direction_follows_sign() {
        let tax = TaxRates {
            buy: dec!(0.05),
            sell: dec!(0.02),
        };
        assert_eq!(tax.for_units(0), dec!(0.05));
        assert_eq!(tax.for_units(10), dec!(0.05));
        assert_eq!(tax.for_units(-10), dec!(0.02));
    }

    #[test]
    fn constants_deserialize_from_json_numbers() {
        let constants: MarketConstants = serde_json::from_str(
            r#"{"resource_base_price": 0.0025, "resource_price_elasticity": 0.0015, "stock_size_modifier": 1000}"#,
        )
        .unwrap();
        assert_eq!(constants.resource_base_price, dec!(0.0025));
        assert_eq!(constants.stock_size_modifier, dec!(1000));
    }
}
