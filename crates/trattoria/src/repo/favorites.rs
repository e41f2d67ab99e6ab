use super::Table;
use crate::error::Result;
use crate::model::{Favorite, RestaurantKey};
use crate::store::RelationBackend;

impl<'s, B: RelationBackend> Table<'s, B, Favorite> {
    pub fn of_customer(&self, username: &str) -> Result<Vec<Favorite>> {
        self.list_by(|f| f.customer == username)
    }

    pub fn is_favorite(&self, username: &str, key: &RestaurantKey) -> Result<bool> {
        self.exists(&Favorite::new(username, key.clone()))
    }
}
