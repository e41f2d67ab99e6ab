use super::Table;
use crate::error::Result;
use crate::model::{Restaurant, RestaurantKey};
use crate::store::RelationBackend;

impl<'s, B: RelationBackend> Table<'s, B, Restaurant> {
    pub fn get(&self, key: &RestaurantKey) -> Result<Option<Restaurant>> {
        self.find(key)
    }

    pub fn by_owner(&self, username: &str) -> Result<Vec<Restaurant>> {
        self.list_by(|r| r.owner == username)
    }

    pub fn by_city(&self, city: &str) -> Result<Vec<Restaurant>> {
        self.list_by(|r| r.key.city == city)
    }
}
