//! # Row Codec
//!
//! Bidirectional mapping between an entity and its row in a relation. Each
//! entity kind implements [`Record`], which owns the positional column layout
//! of its relation (see [`Relation::header`]).
//!
//! ## Field Formats
//!
//! | Semantic type | Persisted as |
//! |---------------|--------------|
//! | decimal | shortest round-trip form (`45.4642`) |
//! | bool | `true` / `false` |
//! | enum | upper-case identifier (`OWNER`, `ITALIAN`) |
//! | date | `YYYY-MM-DD`, empty when absent |
//! | timestamp | RFC 3339, UTC |
//!
//! Quoting of embedded commas, quotes and newlines is handled by the CSV layer
//! in [`crate::store::fs_backend`]; `encode` produces raw field values.
//!
//! ## Foreign Keys at Decode Time
//!
//! Restaurants, reviews and favorites can only be decoded with access to the
//! relations they reference. That access is passed in explicitly as a
//! [`Resolve`] implementation, so the codec holds no store-wide state.
//! A reference that does not resolve makes the row corrupt.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::CorruptRecord;
use crate::model::{
    Coordinates, Favorite, Restaurant, RestaurantKey, Reply, Review, ReviewKey, User,
    ValidationError,
};
use crate::store::{Relation, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";
const LEGACY_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Lookup access to already-decoded relations.
pub trait Resolve {
    fn user(&self, username: &str) -> Option<&User>;
    fn restaurant(&self, key: &RestaurantKey) -> Option<&Restaurant>;
}

/// Which other relations must be loaded before rows of a kind can be decoded
/// and before new rows of that kind can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dependencies {
    None,
    Users,
    /// Restaurants, and therefore users as well.
    Restaurants,
}

pub trait Record: Sized + Clone {
    const RELATION: Relation;
    const DEPENDENCIES: Dependencies;

    /// Natural key used by lookups, updates and removals.
    type Key;

    fn key(&self) -> Self::Key;

    fn matches_key(&self, key: &Self::Key, tolerance: f64) -> bool;

    fn validate(&self) -> Result<(), ValidationError>;

    fn encode(&self) -> Row;

    fn decode(row: &[String], resolver: &dyn Resolve) -> Result<Self, CorruptRecord>;

    /// Whether a raw row of full arity carries `key`, whether or not the rest
    /// of it decodes.
    fn key_in_row(row: &[String], key: &Self::Key, tolerance: f64) -> bool;

    fn same_key(&self, other: &Self, tolerance: f64) -> bool {
        self.matches_key(&other.key(), tolerance)
    }
}

/// Positional reader over one row, producing [`CorruptRecord`] on any
/// malformed field.
struct Fields<'a> {
    relation: Relation,
    row: &'a [String],
}

impl<'a> Fields<'a> {
    fn new(relation: Relation, row: &'a [String]) -> Result<Self, CorruptRecord> {
        if row.len() != relation.arity() {
            return Err(CorruptRecord::new(
                relation,
                format!("expected {} fields, found {}", relation.arity(), row.len()),
            ));
        }
        Ok(Self { relation, row })
    }

    fn column(&self, index: usize) -> &'static str {
        self.relation.header()[index]
    }

    fn corrupt(&self, index: usize, why: impl std::fmt::Display) -> CorruptRecord {
        CorruptRecord::new(
            self.relation,
            format!("field '{}': {}", self.column(index), why),
        )
    }

    fn text(&self, index: usize) -> String {
        self.row[index].clone()
    }

    fn decimal(&self, index: usize) -> Result<f64, CorruptRecord> {
        let raw = self.row[index].trim();
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(_) => Err(self.corrupt(index, "not a finite number")),
            Err(e) => Err(self.corrupt(index, format!("'{}' {}", raw, e))),
        }
    }

    fn stars(&self, index: usize) -> Result<u8, CorruptRecord> {
        let raw = self.row[index].trim();
        raw.parse::<u8>()
            .map_err(|e| self.corrupt(index, format!("'{}' {}", raw, e)))
    }

    fn flag(&self, index: usize) -> Result<bool, CorruptRecord> {
        let raw = self.row[index].trim();
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(self.corrupt(index, format!("'{}' is not true/false", raw)))
        }
    }

    fn parsed<T>(&self, index: usize) -> Result<T, CorruptRecord>
    where
        T: std::str::FromStr<Err = String>,
    {
        self.row[index]
            .parse::<T>()
            .map_err(|e| self.corrupt(index, e))
    }

    fn optional_date(&self, index: usize) -> Result<Option<NaiveDate>, CorruptRecord> {
        let raw = self.row[index].trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|e| self.corrupt(index, format!("'{}' {}", raw, e)))
    }

    fn optional_timestamp(&self, index: usize) -> Result<Option<DateTime<Utc>>, CorruptRecord> {
        let raw = self.row[index].trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| self.corrupt(index, format!("'{}' is not a timestamp", raw)))
    }

    fn timestamp(&self, index: usize) -> Result<DateTime<Utc>, CorruptRecord> {
        self.optional_timestamp(index)?
            .ok_or_else(|| self.corrupt(index, "missing timestamp"))
    }

    /// Six consecutive columns: name, country, city, address, latitude,
    /// longitude (the restaurant reference shared by reviews and favorites).
    fn restaurant_key(&self, start: usize) -> Result<RestaurantKey, CorruptRecord> {
        Ok(RestaurantKey {
            name: self.text(start),
            country: self.text(start + 1),
            city: self.text(start + 2),
            address: self.text(start + 3),
            coordinates: Coordinates::new(self.decimal(start + 4)?, self.decimal(start + 5)?),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LEGACY_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn encode_key(key: &RestaurantKey, row: &mut Row) {
    row.push(key.name.clone());
    row.push(key.country.clone());
    row.push(key.city.clone());
    row.push(key.address.clone());
    row.push(key.coordinates.latitude.to_string());
    row.push(key.coordinates.longitude.to_string());
}

/// Column where the restaurant reference starts in reviews and favorites.
/// Both relations share the layout `username, name, country, city, address,
/// latitude, longitude, ...`.
const REFERENCE_START: usize = 1;

/// Username column of reviews and favorites.
const REFERENCING_USER: usize = 0;

const USERNAME_COLUMN: usize = 2;
const OWNER_COLUMN: usize = 11;

/// Restaurant key read from raw fields: the name at `name_at`, then country,
/// city, address, latitude and longitude from `place_at` on.
fn raw_restaurant_key(row: &[String], name_at: usize, place_at: usize) -> Option<RestaurantKey> {
    let place = row.get(place_at..place_at + 5)?;
    Some(RestaurantKey {
        name: row.get(name_at)?.clone(),
        country: place[0].clone(),
        city: place[1].clone(),
        address: place[2].clone(),
        coordinates: Coordinates::new(
            place[3].trim().parse().ok()?,
            place[4].trim().parse().ok()?,
        ),
    })
}

/// Restaurant reference of a raw review or favorite row, without decoding the
/// rest of the row.
pub(crate) fn referenced_restaurant(row: &[String]) -> Option<RestaurantKey> {
    raw_restaurant_key(row, REFERENCE_START, REFERENCE_START + 1)
}

/// Reviewer or customer of a raw review or favorite row.
pub(crate) fn referencing_user(row: &[String]) -> Option<&str> {
    row.get(REFERENCING_USER).map(String::as_str)
}

/// Owner username of a raw restaurant row.
pub(crate) fn restaurant_owner(row: &[String]) -> Option<&str> {
    row.get(OWNER_COLUMN).map(String::as_str)
}

fn reference_in_row(row: &[String], user: &str, key: &RestaurantKey, tolerance: f64) -> bool {
    referencing_user(row) == Some(user)
        && referenced_restaurant(row).is_some_and(|found| found.matches(key, tolerance))
}

/// Overwrite the restaurant reference of a raw review or favorite row.
pub(crate) fn replace_referenced_restaurant(row: &mut Row, key: &RestaurantKey) {
    let mut encoded = Vec::with_capacity(6);
    encode_key(key, &mut encoded);
    for (offset, field) in encoded.into_iter().enumerate() {
        if let Some(slot) = row.get_mut(REFERENCE_START + offset) {
            *slot = field;
        }
    }
}

fn resolve_restaurant(
    relation: Relation,
    key: &RestaurantKey,
    resolver: &dyn Resolve,
) -> Result<RestaurantKey, CorruptRecord> {
    resolver
        .restaurant(key)
        .map(|restaurant| restaurant.key.clone())
        .ok_or_else(|| {
            CorruptRecord::new(relation, format!("dangling restaurant reference {}", key))
        })
}

impl Record for User {
    const RELATION: Relation = Relation::Users;
    const DEPENDENCIES: Dependencies = Dependencies::None;
    type Key = String;

    fn key(&self) -> String {
        self.username.clone()
    }

    fn matches_key(&self, key: &String, _tolerance: f64) -> bool {
        &self.username == key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        User::validate(self)
    }

    fn encode(&self) -> Row {
        vec![
            self.name.clone(),
            self.surname.clone(),
            self.username.clone(),
            self.password_hash.clone(),
            self.birth_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            self.domicile.clone(),
            self.kind.as_str().to_string(),
        ]
    }

    fn decode(row: &[String], _resolver: &dyn Resolve) -> Result<Self, CorruptRecord> {
        let f = Fields::new(Relation::Users, row)?;
        let user = User {
            name: f.text(0),
            surname: f.text(1),
            username: f.text(2),
            password_hash: f.text(3),
            birth_date: f.optional_date(4)?,
            domicile: f.text(5),
            kind: f.parsed(6)?,
        };
        user.validate()
            .map_err(|e| CorruptRecord::new(Relation::Users, e.to_string()))?;
        Ok(user)
    }

    fn key_in_row(row: &[String], key: &String, _tolerance: f64) -> bool {
        row.get(USERNAME_COLUMN) == Some(key)
    }
}

impl Record for Restaurant {
    const RELATION: Relation = Relation::Restaurants;
    const DEPENDENCIES: Dependencies = Dependencies::Users;
    type Key = RestaurantKey;

    fn key(&self) -> RestaurantKey {
        self.key.clone()
    }

    fn matches_key(&self, key: &RestaurantKey, tolerance: f64) -> bool {
        self.key.matches(key, tolerance)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Restaurant::validate(self)
    }

    fn encode(&self) -> Row {
        vec![
            self.key.name.clone(),
            self.average_price.to_string(),
            self.cuisine.as_str().to_string(),
            self.key.country.clone(),
            self.key.city.clone(),
            self.key.address.clone(),
            self.key.coordinates.latitude.to_string(),
            self.key.coordinates.longitude.to_string(),
            self.description.clone(),
            self.delivery.to_string(),
            self.reservation.to_string(),
            self.owner.clone(),
        ]
    }

    fn decode(row: &[String], resolver: &dyn Resolve) -> Result<Self, CorruptRecord> {
        let f = Fields::new(Relation::Restaurants, row)?;
        let restaurant = Restaurant {
            key: RestaurantKey {
                name: f.text(0),
                country: f.text(3),
                city: f.text(4),
                address: f.text(5),
                coordinates: Coordinates::new(f.decimal(6)?, f.decimal(7)?),
            },
            average_price: f.decimal(1)?,
            cuisine: f.parsed(2)?,
            description: f.text(8),
            delivery: f.flag(9)?,
            reservation: f.flag(10)?,
            owner: f.text(11),
        };
        restaurant
            .validate()
            .map_err(|e| CorruptRecord::new(Relation::Restaurants, e.to_string()))?;

        match resolver.user(&restaurant.owner) {
            Some(user) if user.is_owner() => Ok(restaurant),
            Some(_) => Err(CorruptRecord::new(
                Relation::Restaurants,
                format!("user '{}' is not an owner", restaurant.owner),
            )),
            None => Err(CorruptRecord::new(
                Relation::Restaurants,
                format!("dangling owner reference '{}'", restaurant.owner),
            )),
        }
    }

    fn key_in_row(row: &[String], key: &RestaurantKey, tolerance: f64) -> bool {
        raw_restaurant_key(row, 0, 3).is_some_and(|found| found.matches(key, tolerance))
    }
}

impl Record for Review {
    const RELATION: Relation = Relation::Reviews;
    const DEPENDENCIES: Dependencies = Dependencies::Restaurants;
    type Key = ReviewKey;

    fn key(&self) -> ReviewKey {
        Review::key(self)
    }

    fn matches_key(&self, key: &ReviewKey, tolerance: f64) -> bool {
        key.matches(self, tolerance)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Review::validate(self)
    }

    fn encode(&self) -> Row {
        let mut row = Vec::with_capacity(Relation::Reviews.arity());
        row.push(self.reviewer.clone());
        encode_key(&self.restaurant, &mut row);
        row.push(self.stars.to_string());
        row.push(self.message.clone());
        row.push(format_timestamp(&self.posted_at));
        match &self.reply {
            Some(reply) => {
                row.push(reply.text.clone());
                row.push(format_timestamp(&reply.at));
            }
            None => {
                row.push(String::new());
                row.push(String::new());
            }
        }
        row
    }

    fn decode(row: &[String], resolver: &dyn Resolve) -> Result<Self, CorruptRecord> {
        let f = Fields::new(Relation::Reviews, row)?;
        let referenced = f.restaurant_key(1)?;

        // A reply exists exactly when its timestamp does; the text may be empty.
        let reply = match f.optional_timestamp(11)? {
            Some(at) => Some(Reply { text: f.text(10), at }),
            None if f.row[10].is_empty() => None,
            None => return Err(f.corrupt(11, "reply text without a timestamp")),
        };

        let mut review = Review {
            reviewer: f.text(0),
            restaurant: referenced,
            stars: f.stars(7)?,
            message: f.text(8),
            posted_at: f.timestamp(9)?,
            reply,
        };
        review
            .validate()
            .map_err(|e| CorruptRecord::new(Relation::Reviews, e.to_string()))?;
        review.restaurant = resolve_restaurant(Relation::Reviews, &review.restaurant, resolver)?;
        Ok(review)
    }

    fn key_in_row(row: &[String], key: &ReviewKey, tolerance: f64) -> bool {
        reference_in_row(row, &key.reviewer, &key.restaurant, tolerance)
    }
}

impl Record for Favorite {
    const RELATION: Relation = Relation::Favorites;
    const DEPENDENCIES: Dependencies = Dependencies::Restaurants;
    type Key = Favorite;

    fn key(&self) -> Favorite {
        self.clone()
    }

    fn matches_key(&self, key: &Favorite, tolerance: f64) -> bool {
        self.matches(key, tolerance)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Favorite::validate(self)
    }

    fn encode(&self) -> Row {
        let mut row = Vec::with_capacity(Relation::Favorites.arity());
        row.push(self.customer.clone());
        encode_key(&self.restaurant, &mut row);
        row
    }

    fn decode(row: &[String], resolver: &dyn Resolve) -> Result<Self, CorruptRecord> {
        let f = Fields::new(Relation::Favorites, row)?;
        let mut favorite = Favorite {
            customer: f.text(0),
            restaurant: f.restaurant_key(1)?,
        };
        favorite
            .validate()
            .map_err(|e| CorruptRecord::new(Relation::Favorites, e.to_string()))?;
        favorite.restaurant =
            resolve_restaurant(Relation::Favorites, &favorite.restaurant, resolver)?;
        Ok(favorite)
    }

    fn key_in_row(row: &[String], key: &Favorite, tolerance: f64) -> bool {
        reference_in_row(row, &key.customer, &key.restaurant, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::model::UserKind;

    /// Resolver over a fixed set of entities.
    struct Fixed {
        users: Vec<User>,
        restaurants: Vec<Restaurant>,
    }

    impl Resolve for Fixed {
        fn user(&self, username: &str) -> Option<&User> {
            self.users.iter().find(|u| u.username == username)
        }

        fn restaurant(&self, key: &RestaurantKey) -> Option<&Restaurant> {
            self.restaurants.iter().find(|r| r.key.matches(key, 1e-4))
        }
    }

    fn world() -> Fixed {
        Fixed {
            users: vec![customer("alice"), owner("bruno")],
            restaurants: vec![restaurant("Da Mario", "bruno")],
        }
    }

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_user_round_trip() {
        let user = customer("alice");
        let row = user.encode();
        assert_eq!(row.len(), Relation::Users.arity());
        assert_eq!(row[4], "1990-04-12");
        assert_eq!(row[6], "CUSTOMER");
        assert_eq!(User::decode(&row, &world()).unwrap(), user);
    }

    #[test]
    fn test_user_without_birth_date_round_trip() {
        let mut user = owner("bruno");
        user.birth_date = None;
        let row = user.encode();
        assert_eq!(row[4], "");
        assert_eq!(User::decode(&row, &world()).unwrap(), user);
    }

    #[test]
    fn test_restaurant_round_trip() {
        let restaurant = restaurant("Da Mario", "bruno");
        let row = restaurant.encode();
        assert_eq!(row.len(), Relation::Restaurants.arity());
        assert_eq!(row[1], "25.5");
        assert_eq!(row[9], "true");
        assert_eq!(Restaurant::decode(&row, &world()).unwrap(), restaurant);
    }

    #[test]
    fn test_review_round_trip_with_and_without_reply() {
        let mut review = Review::new("alice", key("Da Mario"), 4, "Ottimo, davvero");
        let decoded = Review::decode(&review.encode(), &world()).unwrap();
        assert_eq!(decoded, review);

        review.reply = Some(Reply {
            text: "Grazie!".to_string(),
            at: Utc::now(),
        });
        let decoded = Review::decode(&review.encode(), &world()).unwrap();
        assert_eq!(decoded, review);
    }

    #[test]
    fn test_review_with_empty_reply_text_keeps_replied_state() {
        let mut review = Review::new("alice", key("Da Mario"), 3, "");
        review.reply = Some(Reply {
            text: String::new(),
            at: Utc::now(),
        });
        let decoded = Review::decode(&review.encode(), &world()).unwrap();
        assert!(decoded.has_reply());
        assert_eq!(decoded.reply.unwrap().text, "");
    }

    #[test]
    fn test_favorite_round_trip() {
        let favorite = Favorite::new("alice", key("Da Mario"));
        let row = favorite.encode();
        assert_eq!(row.len(), Relation::Favorites.arity());
        assert_eq!(Favorite::decode(&row, &world()).unwrap(), favorite);
    }

    #[test]
    fn test_wrong_arity_is_corrupt() {
        let mut row = customer("alice").encode();
        row.push("extra".to_string());
        let err = User::decode(&row, &world()).unwrap_err();
        assert_eq!(err.relation, Relation::Users);
        assert!(err.reason.contains("expected 7 fields"));
    }

    #[test]
    fn test_bad_enum_is_corrupt() {
        let mut row = customer("alice").encode();
        row[6] = "CHEF".to_string();
        assert!(User::decode(&row, &world()).is_err());
    }

    #[test]
    fn test_bad_decimal_is_corrupt() {
        let mut row = restaurant("Da Mario", "bruno").encode();
        row[6] = "north".to_string();
        let err = Restaurant::decode(&row, &world()).unwrap_err();
        assert!(err.reason.contains("latitude"));
    }

    #[test]
    fn test_bad_date_is_corrupt() {
        let mut row = customer("alice").encode();
        row[4] = "12/04/1990".to_string();
        assert!(User::decode(&row, &world()).is_err());
    }

    #[test]
    fn test_restaurant_owned_by_customer_is_corrupt() {
        let row = restaurant("Da Mario", "alice").encode();
        let err = Restaurant::decode(&row, &world()).unwrap_err();
        assert!(err.reason.contains("not an owner"));
    }

    #[test]
    fn test_restaurant_with_unknown_owner_is_corrupt() {
        let row = restaurant("Da Mario", "ghost").encode();
        assert!(Restaurant::decode(&row, &world()).is_err());
    }

    #[test]
    fn test_review_with_dangling_restaurant_is_corrupt() {
        let review = Review::new("alice", key("Nowhere"), 4, "");
        let err = Review::decode(&review.encode(), &world()).unwrap_err();
        assert!(err.reason.contains("dangling"));
    }

    #[test]
    fn test_review_key_is_normalized_to_stored_restaurant() {
        let mut drifted = key("Da Mario");
        drifted.coordinates.latitude = 45.46425;
        let review = Review::new("alice", drifted, 4, "");
        let decoded = Review::decode(&review.encode(), &world()).unwrap();
        assert_eq!(decoded.restaurant.coordinates.latitude, 45.4642);
    }

    #[test]
    fn test_review_stars_out_of_range_is_corrupt() {
        let mut row = Review::new("alice", key("Da Mario"), 4, "").encode();
        row[7] = "9".to_string();
        assert!(Review::decode(&row, &world()).is_err());
    }

    #[test]
    fn test_reply_text_without_timestamp_is_corrupt() {
        let mut row = Review::new("alice", key("Da Mario"), 4, "").encode();
        row[10] = "Thanks".to_string();
        assert!(Review::decode(&row, &world()).is_err());
    }

    #[test]
    fn test_legacy_timestamp_is_accepted() {
        let mut row = Review::new("alice", key("Da Mario"), 4, "").encode();
        row[9] = "2021-06-01 19:30".to_string();
        let review = Review::decode(&row, &world()).unwrap();
        assert_eq!(format_timestamp(&review.posted_at), "2021-06-01T19:30:00Z");
    }

    #[test]
    fn test_raw_reference_helpers() {
        let mut row = Favorite::new("alice", key("Da Mario")).encode();
        assert_eq!(referenced_restaurant(&row), Some(key("Da Mario")));

        replace_referenced_restaurant(&mut row, &key("Zen"));
        assert_eq!(row[0], "alice");
        assert_eq!(referenced_restaurant(&row), Some(key("Zen")));

        assert_eq!(referenced_restaurant(&row[..3]), None);
    }

    #[test]
    fn test_key_in_row_ignores_the_rest_of_the_row() {
        let mut user_row = customer("alice").encode();
        user_row[4] = "not a date".to_string();
        assert!(User::decode(&user_row, &world()).is_err());
        assert!(User::key_in_row(&user_row, &"alice".to_string(), 1e-4));
        assert!(!User::key_in_row(&user_row, &"bruno".to_string(), 1e-4));

        let restaurant_row = restaurant("Orphan", "ghost").encode();
        assert!(Restaurant::key_in_row(&restaurant_row, &key("Orphan"), 1e-4));
        assert_eq!(restaurant_owner(&restaurant_row), Some("ghost"));

        let review_row = Review::new("alice", key("Nowhere"), 3, "").encode();
        let review_key = ReviewKey::new("alice", key("Nowhere"));
        assert!(Review::key_in_row(&review_row, &review_key, 1e-4));
        assert_eq!(referencing_user(&review_row), Some("alice"));
        let other = ReviewKey::new("carla", key("Nowhere"));
        assert!(!Review::key_in_row(&review_row, &other, 1e-4));
    }

    #[test]
    fn test_decode_from_hand_written_row() {
        let row = row(&[
            "Carla", "Bianchi", "carla", "x$y", "", "Torino", "owner",
        ]);
        let user = User::decode(&row, &world()).unwrap();
        assert_eq!(user.kind, UserKind::Owner);
        assert_eq!(user.birth_date, None);
    }
}
