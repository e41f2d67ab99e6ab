//! # Domain Model
//!
//! The four entity kinds persisted by the store: [`User`], [`Restaurant`],
//! [`Review`] and [`Favorite`].
//!
//! ## Identity
//!
//! Nothing carries a surrogate id. Every entity is identified by a natural key:
//!
//! | Entity | Natural key |
//! |--------|-------------|
//! | `User` | `username` (case-sensitive) |
//! | `Restaurant` | [`RestaurantKey`]: name, country, city, address, coordinates |
//! | `Review` | [`ReviewKey`]: reviewer + `RestaurantKey` |
//! | `Favorite` | customer + `RestaurantKey` |
//!
//! Text components of a [`RestaurantKey`] compare exactly (case-sensitive).
//! Coordinates compare within an absolute tolerance, because the same point may
//! be re-serialized with a different number of decimals across rewrites.
//!
//! ## Validation
//!
//! `validate()` on each entity checks the rules that do not need any other
//! relation: required text present, numeric ranges. Cross-relation rules live
//! in [`crate::integrity`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserKind {
    Customer,
    Owner,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Customer => "CUSTOMER",
            UserKind::Owner => "OWNER",
        }
    }
}

impl FromStr for UserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(UserKind::Customer),
            "OWNER" => Ok(UserKind::Owner),
            other => Err(format!("unknown user kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CuisineKind {
    Italian,
    Pizzeria,
    Chinese,
    Japanese,
    Indian,
    Mexican,
    French,
    Greek,
    Thai,
    American,
    Vegetarian,
    Other,
}

impl CuisineKind {
    pub const ALL: [CuisineKind; 12] = [
        CuisineKind::Italian,
        CuisineKind::Pizzeria,
        CuisineKind::Chinese,
        CuisineKind::Japanese,
        CuisineKind::Indian,
        CuisineKind::Mexican,
        CuisineKind::French,
        CuisineKind::Greek,
        CuisineKind::Thai,
        CuisineKind::American,
        CuisineKind::Vegetarian,
        CuisineKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CuisineKind::Italian => "ITALIAN",
            CuisineKind::Pizzeria => "PIZZERIA",
            CuisineKind::Chinese => "CHINESE",
            CuisineKind::Japanese => "JAPANESE",
            CuisineKind::Indian => "INDIAN",
            CuisineKind::Mexican => "MEXICAN",
            CuisineKind::French => "FRENCH",
            CuisineKind::Greek => "GREEK",
            CuisineKind::Thai => "THAI",
            CuisineKind::American => "AMERICAN",
            CuisineKind::Vegetarian => "VEGETARIAN",
            CuisineKind::Other => "OTHER",
        }
    }
}

impl FromStr for CuisineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        CuisineKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown cuisine kind '{}'", s.trim()))
    }
}

/// Rule violations detectable on a single entity, before any I/O.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("average price must be a positive number, got {0}")]
    InvalidPrice(f64),

    #[error("stars must be between 1 and 5, got {0}")]
    StarsOutOfRange(u8),

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("birth date {0} is in the future")]
    BirthDateInFuture(NaiveDate),
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub surname: String,
    pub username: String,
    /// Opaque output of a [`crate::auth::PasswordHasher`].
    pub password_hash: String,
    pub birth_date: Option<NaiveDate>,
    pub domicile: String,
    pub kind: UserKind,
}

impl User {
    pub fn is_owner(&self) -> bool {
        self.kind == UserKind::Owner
    }

    pub fn is_customer(&self) -> bool {
        self.kind == UserKind::Customer
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("surname", &self.surname)?;
        require("username", &self.username)?;
        require("password_hash", &self.password_hash)?;
        require("domicile", &self.domicile)?;
        if let Some(date) = self.birth_date {
            if date > Utc::now().date_naive() {
                return Err(ValidationError::BirthDateInFuture(date));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both axes within `tolerance` degrees of each other.
    pub fn approx_eq(&self, other: &Coordinates, tolerance: f64) -> bool {
        (self.latitude - other.latitude).abs() <= tolerance
            && (self.longitude - other.longitude).abs() <= tolerance
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// Natural key of a restaurant, also used as the foreign key stored by
/// reviews and favorites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantKey {
    pub name: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub coordinates: Coordinates,
}

impl RestaurantKey {
    /// The single identity rule for restaurants.
    pub fn matches(&self, other: &RestaurantKey, tolerance: f64) -> bool {
        self.name == other.name
            && self.country == other.country
            && self.city == other.city
            && self.address == other.address
            && self.coordinates.approx_eq(&other.coordinates, tolerance)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("country", &self.country)?;
        require("city", &self.city)?;
        require("address", &self.address)?;
        self.coordinates.validate()
    }
}

impl fmt::Display for RestaurantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.name, self.address, self.city, self.country
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub key: RestaurantKey,
    pub average_price: f64,
    pub cuisine: CuisineKind,
    pub description: String,
    pub delivery: bool,
    pub reservation: bool,
    /// Username of the owning [`User`], who must be an owner.
    pub owner: String,
}

impl Restaurant {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.key.validate()?;
        if !self.average_price.is_finite() || self.average_price <= 0.0 {
            return Err(ValidationError::InvalidPrice(self.average_price));
        }
        require("owner", &self.owner)
    }
}

/// An owner's answer to a review.
///
/// An empty `text` is how a withdrawn reply is represented; there is no
/// transition back to "no reply".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: String,
    pub restaurant: RestaurantKey,
    pub stars: u8,
    pub message: String,
    pub posted_at: DateTime<Utc>,
    pub reply: Option<Reply>,
}

impl Review {
    pub fn new(
        reviewer: impl Into<String>,
        restaurant: RestaurantKey,
        stars: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            restaurant,
            stars,
            message: message.into(),
            posted_at: Utc::now(),
            reply: None,
        }
    }

    pub fn key(&self) -> ReviewKey {
        ReviewKey {
            reviewer: self.reviewer.clone(),
            restaurant: self.restaurant.clone(),
        }
    }

    pub fn has_reply(&self) -> bool {
        self.reply.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("reviewer", &self.reviewer)?;
        self.restaurant.validate()?;
        if !(1..=5).contains(&self.stars) {
            return Err(ValidationError::StarsOutOfRange(self.stars));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewKey {
    pub reviewer: String,
    pub restaurant: RestaurantKey,
}

impl ReviewKey {
    pub fn new(reviewer: impl Into<String>, restaurant: RestaurantKey) -> Self {
        Self {
            reviewer: reviewer.into(),
            restaurant,
        }
    }

    pub fn matches(&self, review: &Review, tolerance: f64) -> bool {
        self.reviewer == review.reviewer && self.restaurant.matches(&review.restaurant, tolerance)
    }
}

/// A customer's bookmark of a restaurant. The whole row is its natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub customer: String,
    pub restaurant: RestaurantKey,
}

impl Favorite {
    pub fn new(customer: impl Into<String>, restaurant: RestaurantKey) -> Self {
        Self {
            customer: customer.into(),
            restaurant,
        }
    }

    pub fn matches(&self, other: &Favorite, tolerance: f64) -> bool {
        self.customer == other.customer && self.restaurant.matches(&other.restaurant, tolerance)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("customer", &self.customer)?;
        self.restaurant.validate()
    }
}
