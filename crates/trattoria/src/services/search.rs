//! Restaurant search.
//!
//! A [`RestaurantQuery`] is a conjunction of optional criteria. Unset criteria
//! match everything, so the default query returns every restaurant. Place
//! names compare case-insensitively here, unlike the natural key.

use crate::error::Result;
use crate::model::{CuisineKind, Restaurant, Review};
use crate::store::{RecordStore, RelationBackend};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub cuisine: Option<CuisineKind>,
    pub max_price: Option<f64>,
    pub delivery: Option<bool>,
    pub reservation: Option<bool>,
    /// Restaurants without reviews never satisfy this.
    pub min_stars: Option<f64>,
    pub name_contains: Option<String>,
}

impl RestaurantQuery {
    pub fn in_city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Default::default()
        }
    }

    fn matches_restaurant(&self, restaurant: &Restaurant) -> bool {
        let key = &restaurant.key;
        same_place(self.city.as_deref(), &key.city)
            && same_place(self.country.as_deref(), &key.country)
            && self.cuisine.map_or(true, |c| c == restaurant.cuisine)
            && self.max_price.map_or(true, |p| restaurant.average_price <= p)
            && self.delivery.map_or(true, |d| d == restaurant.delivery)
            && self.reservation.map_or(true, |r| r == restaurant.reservation)
            && self.name_contains.as_deref().map_or(true, |needle| {
                key.name.to_lowercase().contains(&needle.to_lowercase())
            })
    }

    fn matches_rating(&self, average: Option<f64>) -> bool {
        match self.min_stars {
            None => true,
            Some(min) => average.is_some_and(|avg| avg >= min),
        }
    }
}

fn same_place(wanted: Option<&str>, actual: &str) -> bool {
    wanted.map_or(true, |w| w.trim().eq_ignore_ascii_case(actual.trim()))
}

/// One search result with its rating summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub restaurant: Restaurant,
    pub average_stars: Option<f64>,
    pub review_count: usize,
}

/// Every restaurant matching `query`, in file order.
pub fn search<B: RelationBackend>(
    store: &RecordStore<B>,
    query: &RestaurantQuery,
) -> Result<Vec<SearchHit>> {
    let tolerance = store.tolerance();
    let candidates = store
        .restaurants()
        .list_by(|r| query.matches_restaurant(r))?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let reviews = store.reviews().list()?;

    let hits = candidates
        .into_iter()
        .filter_map(|restaurant| {
            let own: Vec<&Review> = reviews
                .iter()
                .filter(|r| r.restaurant.matches(&restaurant.key, tolerance))
                .collect();
            let average_stars = if own.is_empty() {
                None
            } else {
                let total: u32 = own.iter().map(|r| u32::from(r.stars)).sum();
                Some(f64::from(total) / own.len() as f64)
            };
            query.matches_rating(average_stars).then(|| SearchHit {
                restaurant,
                average_stars,
                review_count: own.len(),
            })
        })
        .collect();
    Ok(hits)
}
