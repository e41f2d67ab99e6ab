//! A logged-in restaurant owner.
//!
//! [`Owner`] holds the restaurants the user owns and gates every write on
//! ownership. Reviews are read per call; an owner's view of them is only ever
//! a filter over the reviews relation.
//!
//! ## Key changes
//!
//! Reviews and favorites reference a restaurant by its natural key. When an
//! update moves a restaurant to a new key, the dependents are rewritten to
//! point at it; when a restaurant is closed, they are deleted. Each relation is
//! rewritten on its own, so a fault between them leaves the earlier ones done.
//! The session follows the restaurant write as soon as it lands, even if the
//! dependents then fail to follow.

use chrono::Utc;
use log::debug;

use crate::error::Result;
use crate::geo::{GeoLookup, Geocoder};
use crate::integrity::Rejection;
use crate::model::{Coordinates, CuisineKind, Restaurant, RestaurantKey, Review, ReviewKey, User};
use crate::repo::WriteOutcome;
use crate::store::{RecordStore, RelationBackend};

/// A restaurant before it has a location.
#[derive(Debug, Clone)]
pub struct RestaurantDraft {
    pub name: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub average_price: f64,
    pub cuisine: CuisineKind,
    pub description: String,
    pub delivery: bool,
    pub reservation: bool,
}

impl RestaurantDraft {
    /// Free-form address handed to the geocoder.
    pub fn full_address(&self) -> String {
        format!("{}, {}, {}", self.address, self.city, self.country)
    }

    fn place(self, coordinates: Coordinates, owner: &str) -> Restaurant {
        Restaurant {
            key: RestaurantKey {
                name: self.name,
                country: self.country,
                city: self.city,
                address: self.address,
                coordinates,
            },
            average_price: self.average_price,
            cuisine: self.cuisine,
            description: self.description,
            delivery: self.delivery,
            reservation: self.reservation,
            owner: owner.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Owner {
    user: User,
    restaurants: Vec<Restaurant>,
}

impl Owner {
    /// `None` when `username` is unknown or not an owner.
    pub fn load<B: RelationBackend>(store: &RecordStore<B>, username: &str) -> Result<Option<Self>> {
        let Some(user) = store.users().get(username)? else {
            return Ok(None);
        };
        if !user.is_owner() {
            return Ok(None);
        }
        let restaurants = store.restaurants().by_owner(&user.username)?;
        Ok(Some(Self { user, restaurants }))
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        &self.restaurants
    }

    fn owned(&self, key: &RestaurantKey, tolerance: f64) -> Option<usize> {
        self.restaurants
            .iter()
            .position(|r| r.key.matches(key, tolerance))
    }

    fn require_owned(&self, key: &RestaurantKey, tolerance: f64) -> Option<Rejection> {
        match self.owned(key, tolerance) {
            Some(_) => None,
            None => Some(Rejection::ForeignRestaurant(key.clone())),
        }
    }

    /// Locate `draft` with `geocoder`, falling back to `manual` when the
    /// address does not resolve, and add it.
    pub fn open_restaurant<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        geocoder: &dyn Geocoder,
        draft: RestaurantDraft,
        manual: Option<Coordinates>,
    ) -> Result<WriteOutcome> {
        let coordinates = match geocoder.resolve_coordinates(&draft.full_address()) {
            GeoLookup::Resolved(found) => found,
            GeoLookup::Unresolved => match manual {
                Some(given) => given,
                None => return Ok(WriteOutcome::Rejected(Rejection::Unlocatable)),
            },
        };
        let restaurant = draft.place(coordinates, &self.user.username);
        let outcome = store.restaurants().try_add(&restaurant)?;
        if outcome.is_applied() {
            self.restaurants.push(restaurant);
        }
        Ok(outcome)
    }

    /// Replace the owned restaurant at `old` with `updated`.
    ///
    /// The owner of `updated` is always this user. When the key changes, every
    /// review and favorite of the restaurant follows it.
    pub fn update_restaurant<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        old: &RestaurantKey,
        mut updated: Restaurant,
    ) -> Result<WriteOutcome> {
        let tolerance = store.tolerance();
        let Some(position) = self.owned(old, tolerance) else {
            return Ok(WriteOutcome::Rejected(Rejection::ForeignRestaurant(old.clone())));
        };
        updated.owner = self.user.username.clone();

        let current = self.restaurants[position].clone();
        let outcome = store
            .restaurants()
            .try_update_detached(&current, &updated)?;
        if !outcome.is_applied() {
            return Ok(outcome);
        }
        let rekeyed = !current.key.matches(&updated.key, tolerance);
        let new_key = updated.key.clone();
        self.restaurants[position] = updated;
        if rekeyed {
            let moved = store
                .integrity()
                .cascade_restaurant(&current.key, Some(&new_key))?;
            debug!("{} dependents moved to {}", moved, new_key);
        }
        Ok(outcome)
    }

    /// Remove an owned restaurant together with its reviews and favorites.
    pub fn close_restaurant<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        key: &RestaurantKey,
    ) -> Result<WriteOutcome> {
        let tolerance = store.tolerance();
        let Some(position) = self.owned(key, tolerance) else {
            return Ok(WriteOutcome::Rejected(Rejection::ForeignRestaurant(key.clone())));
        };
        let closing = self.restaurants[position].clone();
        let outcome = store.restaurants().try_remove_detached(&closing)?;
        if !outcome.is_applied() {
            return Ok(outcome);
        }
        self.restaurants.remove(position);
        let dropped = store.integrity().cascade_restaurant(&closing.key, None)?;
        debug!("{} dependents dropped with {}", dropped, closing.key);
        Ok(outcome)
    }

    pub fn reply<B: RelationBackend>(
        &self,
        store: &RecordStore<B>,
        review: &ReviewKey,
        text: &str,
    ) -> Result<WriteOutcome> {
        if let Some(rejection) = self.require_owned(&review.restaurant, store.tolerance()) {
            return Ok(WriteOutcome::Rejected(rejection));
        }
        store.reviews().add_reply(review, text, Utc::now())
    }

    pub fn edit_reply<B: RelationBackend>(
        &self,
        store: &RecordStore<B>,
        review: &ReviewKey,
        text: &str,
    ) -> Result<WriteOutcome> {
        if let Some(rejection) = self.require_owned(&review.restaurant, store.tolerance()) {
            return Ok(WriteOutcome::Rejected(rejection));
        }
        store.reviews().edit_reply(review, text, Utc::now())
    }

    /// Reviews of any owned restaurant.
    pub fn reviews<B: RelationBackend>(&self, store: &RecordStore<B>) -> Result<Vec<Review>> {
        let tolerance = store.tolerance();
        store
            .reviews()
            .list_by(|r| self.owned(&r.restaurant, tolerance).is_some())
    }

    pub fn unanswered_reviews<B: RelationBackend>(
        &self,
        store: &RecordStore<B>,
    ) -> Result<Vec<Review>> {
        Ok(self
            .reviews(store)?
            .into_iter()
            .filter(|r| !r.has_reply())
            .collect())
    }

    pub fn reviews_with_stars<B: RelationBackend>(
        &self,
        store: &RecordStore<B>,
        stars: u8,
    ) -> Result<Vec<Review>> {
        Ok(self
            .reviews(store)?
            .into_iter()
            .filter(|r| r.stars == stars)
            .collect())
    }
}
