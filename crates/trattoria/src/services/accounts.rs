use chrono::NaiveDate;

use crate::auth::PasswordHasher;
use crate::error::Result;
use crate::integrity::Rejection;
use crate::model::{User, UserKind, ValidationError};
use crate::repo::WriteOutcome;
use crate::store::{RecordStore, RelationBackend};

/// Registration form. The password is given separately, in clear.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub birth_date: Option<NaiveDate>,
    pub domicile: String,
    pub kind: UserKind,
}

impl NewUser {
    fn into_user(self, password_hash: String) -> User {
        User {
            name: self.name,
            surname: self.surname,
            username: self.username,
            password_hash,
            birth_date: self.birth_date,
            domicile: self.domicile,
            kind: self.kind,
        }
    }
}

pub fn register<B, H>(
    store: &RecordStore<B>,
    hasher: &H,
    new_user: NewUser,
    password: &str,
) -> Result<WriteOutcome>
where
    B: RelationBackend,
    H: PasswordHasher + ?Sized,
{
    if password.is_empty() {
        return Ok(WriteOutcome::Rejected(Rejection::Invalid(
            ValidationError::EmptyField("password"),
        )));
    }
    let user = new_user.into_user(hasher.hash(password));
    store.users().try_add(&user)
}

/// The user, if `username` exists and `password` matches.
pub fn authenticate<B, H>(
    store: &RecordStore<B>,
    hasher: &H,
    username: &str,
    password: &str,
) -> Result<Option<User>>
where
    B: RelationBackend,
    H: PasswordHasher + ?Sized,
{
    Ok(store
        .users()
        .get(username)?
        .filter(|user| hasher.verify(password, &user.password_hash)))
}

pub fn change_password<B, H>(
    store: &RecordStore<B>,
    hasher: &H,
    username: &str,
    current: &str,
    replacement: &str,
) -> Result<WriteOutcome>
where
    B: RelationBackend,
    H: PasswordHasher + ?Sized,
{
    if replacement.is_empty() {
        return Ok(WriteOutcome::Rejected(Rejection::Invalid(
            ValidationError::EmptyField("password"),
        )));
    }
    let hashed = hasher.hash(replacement);
    store.users().try_modify(&username.to_string(), |user| {
        if !hasher.verify(current, &user.password_hash) {
            return Some(Rejection::WrongPassword);
        }
        user.password_hash = hashed;
        None
    })
}
