//! A logged-in customer and the records that belong to them.
//!
//! [`Customer`] caches the user's reviews and favorites so a front end can
//! render them without a full scan per keystroke. Every write goes through the
//! repositories first; the cache follows only an applied write.

use crate::error::Result;
use crate::integrity::{Constrained, Rejection};
use crate::model::{Favorite, RestaurantKey, Review, ReviewKey, User};
use crate::repo::WriteOutcome;
use crate::store::{RecordStore, RelationBackend};

#[derive(Debug, Clone)]
pub struct Customer {
    user: User,
    reviews: Vec<Review>,
    favorites: Vec<Favorite>,
}

impl Customer {
    /// `None` when `username` is unknown or not a customer.
    pub fn load<B: RelationBackend>(store: &RecordStore<B>, username: &str) -> Result<Option<Self>> {
        let Some(user) = store.users().get(username)? else {
            return Ok(None);
        };
        if !user.is_customer() {
            return Ok(None);
        }
        let mut customer = Self {
            user,
            reviews: Vec::new(),
            favorites: Vec::new(),
        };
        customer.refresh(store)?;
        Ok(Some(customer))
    }

    /// Reload both caches from the relations.
    pub fn refresh<B: RelationBackend>(&mut self, store: &RecordStore<B>) -> Result<()> {
        self.reviews = store.reviews().by_reviewer(&self.user.username)?;
        self.favorites = store.favorites().of_customer(&self.user.username)?;
        Ok(())
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    fn cached_review(&self, restaurant: &RestaurantKey, tolerance: f64) -> Option<usize> {
        self.reviews
            .iter()
            .position(|r| r.restaurant.matches(restaurant, tolerance))
    }

    pub fn write_review<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        restaurant: &RestaurantKey,
        stars: u8,
        message: &str,
    ) -> Result<WriteOutcome> {
        let review = Review::new(self.user.username.as_str(), restaurant.clone(), stars, message);
        if self.cached_review(restaurant, store.tolerance()).is_some() {
            return Ok(WriteOutcome::Rejected(Rejection::Duplicate(
                review.describe_key(),
            )));
        }
        let outcome = store.reviews().try_add(&review)?;
        if outcome.is_applied() {
            self.reviews.push(review);
        }
        Ok(outcome)
    }

    /// Change stars and message. Any reply stays as it is.
    pub fn edit_review<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        restaurant: &RestaurantKey,
        stars: u8,
        message: &str,
    ) -> Result<WriteOutcome> {
        let key = ReviewKey::new(self.user.username.as_str(), restaurant.clone());
        let mut edited = None;
        let outcome = store.reviews().try_modify(&key, |review| {
            review.stars = stars;
            review.message = message.to_string();
            edited = Some(review.clone());
            None
        })?;
        if outcome.is_applied() {
            if let (Some(review), Some(i)) =
                (edited, self.cached_review(restaurant, store.tolerance()))
            {
                self.reviews[i] = review;
            }
        }
        Ok(outcome)
    }

    pub fn delete_review<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        restaurant: &RestaurantKey,
    ) -> Result<WriteOutcome> {
        let tolerance = store.tolerance();
        let username = self.user.username.as_str();
        let removed = store
            .reviews()
            .remove_where(|r| r.reviewer == username && r.restaurant.matches(restaurant, tolerance))?;
        if removed == 0 {
            return Ok(WriteOutcome::Rejected(Rejection::NotFound));
        }
        self.reviews
            .retain(|r| !r.restaurant.matches(restaurant, tolerance));
        Ok(WriteOutcome::Applied)
    }

    pub fn add_favorite<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        restaurant: &RestaurantKey,
    ) -> Result<WriteOutcome> {
        let favorite = Favorite::new(self.user.username.as_str(), restaurant.clone());
        let outcome = store.favorites().try_add(&favorite)?;
        if outcome.is_applied() {
            self.favorites.push(favorite);
        }
        Ok(outcome)
    }

    pub fn remove_favorite<B: RelationBackend>(
        &mut self,
        store: &RecordStore<B>,
        restaurant: &RestaurantKey,
    ) -> Result<WriteOutcome> {
        let favorite = Favorite::new(self.user.username.as_str(), restaurant.clone());
        let outcome = store.favorites().try_remove(&favorite)?;
        if outcome.is_applied() {
            let tolerance = store.tolerance();
            self.favorites
                .retain(|f| !f.restaurant.matches(restaurant, tolerance));
        }
        Ok(outcome)
    }
}
