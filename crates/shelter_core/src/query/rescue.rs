//! Rescue-category filters for search-and-rescue candidate dogs.
//!
//! # Responsibility
//! - Map each rescue category to its fixed breed/sex/age criteria.
//! - Keep the lenient string entry point used by the dashboard selector.
//!
//! # Invariants
//! - Breed lists, sexes and age bounds are domain constants.
//! - `build_rescue_query` is total: unrecognized input yields the empty
//!   predicate, which matches every document.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::model::document::Predicate;

pub const FIELD_ANIMAL_TYPE: &str = "animal_type";
pub const FIELD_BREED: &str = "breed";
pub const FIELD_SEX: &str = "sex_upon_outcome";
pub const FIELD_AGE_WEEKS: &str = "age_upon_outcome_in_weeks";

const DOG: &str = "Dog";
const INTACT_FEMALE: &str = "Intact Female";
const INTACT_MALE: &str = "Intact Male";

const WATER_BREEDS: [&str; 3] = [
    "Labrador Retriever Mix",
    "Chesapeake Bay Retr Mix",
    "Newfoundland",
];
const MOUNTAIN_BREEDS: [&str; 5] = [
    "German Shepherd",
    "Alaskan Malamute",
    "Old English Sheepdog",
    "Siberian Husky",
    "Rottweiler",
];
const DISASTER_BREEDS: [&str; 5] = [
    "Doberman Pinscher",
    "German Shepherd",
    "Golden Retriever",
    "Bloodhound",
    "Rottweiler",
];

/// Dashboard rescue filter option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RescueCategory {
    Water,
    Mountain,
    Disaster,
    /// Show every animal.
    Reset,
}

/// Selector value that names no rescue category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown rescue category `{}`; expected water|mountain|disaster|reset",
            self.0
        )
    }
}

impl Error for UnknownCategory {}

impl RescueCategory {
    /// Options in dashboard display order.
    pub const ALL: [Self; 4] = [Self::Water, Self::Mountain, Self::Disaster, Self::Reset];

    /// Selector value used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Mountain => "mountain",
            Self::Disaster => "disaster",
            Self::Reset => "reset",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Water => "Water Rescue",
            Self::Mountain => "Mountain or Wilderness Rescue",
            Self::Disaster => "Disaster or Individual Tracking",
            Self::Reset => "Reset (Show All)",
        }
    }

    /// Lenient parse: anything unrecognized selects `Reset`.
    pub fn from_selection(value: &str) -> Self {
        value.parse().unwrap_or(Self::Reset)
    }

    pub fn predicate(self) -> Predicate {
        match self {
            Self::Water => dog_predicate(&WATER_BREEDS, INTACT_FEMALE, 26, 156),
            Self::Mountain => dog_predicate(&MOUNTAIN_BREEDS, INTACT_MALE, 26, 156),
            Self::Disaster => dog_predicate(&DISASTER_BREEDS, INTACT_MALE, 20, 300),
            Self::Reset => Predicate::new(),
        }
    }
}

impl FromStr for RescueCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

impl Display for RescueCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the filter for a dashboard selector value.
///
/// Total over all strings; see [`RescueCategory::from_selection`].
pub fn build_rescue_query(category: &str) -> Predicate {
    RescueCategory::from_selection(category).predicate()
}

fn dog_predicate(breeds: &[&str], sex: &str, min_weeks: i64, max_weeks: i64) -> Predicate {
    Predicate::new()
        .equals(FIELD_ANIMAL_TYPE, DOG)
        .any_of(FIELD_BREED, breeds.iter().copied())
        .equals(FIELD_SEX, sex)
        .between(FIELD_AGE_WEEKS, min_weeks, max_weeks)
}
