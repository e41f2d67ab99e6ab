//! Review finders and the reply state machine.
//!
//! ```text
//! NoReply --add_reply--> Replied --edit_reply--> Replied
//! ```
//!
//! There is no way back to `NoReply`. Withdrawing a reply means editing its
//! text to the empty string.

use chrono::{DateTime, Utc};

use super::{Table, WriteOutcome};
use crate::error::Result;
use crate::integrity::Rejection;
use crate::model::{Reply, RestaurantKey, Review, ReviewKey};
use crate::store::RelationBackend;

impl<'s, B: RelationBackend> Table<'s, B, Review> {
    pub fn by_reviewer(&self, username: &str) -> Result<Vec<Review>> {
        self.list_by(|r| r.reviewer == username)
    }

    pub fn for_restaurant(&self, key: &RestaurantKey) -> Result<Vec<Review>> {
        let tolerance = self.tolerance();
        self.list_by(|r| r.restaurant.matches(key, tolerance))
    }

    pub fn unanswered(&self) -> Result<Vec<Review>> {
        self.list_by(|r| !r.has_reply())
    }

    pub fn with_stars(&self, stars: u8) -> Result<Vec<Review>> {
        self.list_by(|r| r.stars == stars)
    }

    /// Mean star rating of a restaurant, `None` when it has no reviews.
    pub fn average_stars(&self, key: &RestaurantKey) -> Result<Option<f64>> {
        let reviews = self.for_restaurant(key)?;
        if reviews.is_empty() {
            return Ok(None);
        }
        let total: u32 = reviews.iter().map(|r| u32::from(r.stars)).sum();
        Ok(Some(f64::from(total) / reviews.len() as f64))
    }

    /// NoReply -> Replied. Refused if the review already has a reply.
    pub fn add_reply(
        &self,
        key: &ReviewKey,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let text = text.into();
        self.try_modify(key, |review| {
            if review.reply.is_some() {
                return Some(Rejection::AlreadyReplied);
            }
            review.reply = Some(Reply { text, at });
            None
        })
    }

    /// Replied -> Replied. Refused if the review has never been replied to.
    pub fn edit_reply(
        &self,
        key: &ReviewKey,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let text = text.into();
        self.try_modify(key, |review| match review.reply.as_mut() {
            Some(reply) => {
                reply.text = text;
                reply.at = at;
                None
            }
            None => Some(Rejection::NoReply),
        })
    }
}
