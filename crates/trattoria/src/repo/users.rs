use super::Table;
use crate::error::Result;
use crate::model::{User, UserKind};
use crate::store::RelationBackend;

impl<'s, B: RelationBackend> Table<'s, B, User> {
    pub fn get(&self, username: &str) -> Result<Option<User>> {
        Ok(self.list()?.into_iter().find(|u| u.username == username))
    }

    pub fn of_kind(&self, kind: UserKind) -> Result<Vec<User>> {
        self.list_by(|u| u.kind == kind)
    }

    pub fn owners(&self) -> Result<Vec<User>> {
        self.of_kind(UserKind::Owner)
    }

    pub fn customers(&self) -> Result<Vec<User>> {
        self.of_kind(UserKind::Customer)
    }
}
