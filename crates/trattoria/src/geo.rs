//! Geocoding collaborator.
//!
//! Turning an address into coordinates is someone else's job (usually a remote
//! service). The store only consumes the result; when a lookup comes back
//! [`GeoLookup::Unresolved`] the caller falls back to coordinates entered by
//! hand.

use crate::model::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoLookup {
    Resolved(Coordinates),
    Unresolved,
}

pub trait Geocoder {
    fn resolve_coordinates(&self, address: &str) -> GeoLookup;
}

/// Always `Unresolved`. For setups without a geocoding service, where every
/// restaurant is placed with manually entered coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualOnly;

impl Geocoder for ManualOnly {
    fn resolve_coordinates(&self, _address: &str) -> GeoLookup {
        GeoLookup::Unresolved
    }
}
