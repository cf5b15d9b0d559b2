use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const MIN_KIDS: u32 = 1;
pub const MAX_KIDS: u32 = 999;

/// One of the six required slots of an activity, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityField {
    Name,
    ActivityType,
    Location,
    NumberOfKids,
    YouthHouse,
    Date,
}

impl ActivityField {
    pub const ALL: [ActivityField; 6] = [
        ActivityField::Name,
        ActivityField::ActivityType,
        ActivityField::Location,
        ActivityField::NumberOfKids,
        ActivityField::YouthHouse,
        ActivityField::Date,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ActivityType => "activity_type",
            Self::Location => "location",
            Self::NumberOfKids => "number_of_kids",
            Self::YouthHouse => "youth_house",
            Self::Date => "date",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key.trim())
    }
}

impl fmt::Display for ActivityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returns the count when it lies in the accepted `MIN_KIDS..=MAX_KIDS` range.
pub fn accept_kid_count(value: u32) -> Option<u32> {
    (MIN_KIDS..=MAX_KIDS).contains(&value).then_some(value)
}

/// Partial field set produced by a single extraction strategy.
///
/// A strategy that found nothing for a field leaves it `None`; the setters
/// refuse empty strings and out-of-range counts so `Some` always means a
/// real candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_kids: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youth_house: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        ActivityField::ALL.iter().all(|field| !self.has(*field))
    }

    /// Present and non-empty.
    pub fn has(&self, field: ActivityField) -> bool {
        match field {
            ActivityField::NumberOfKids => self.number_of_kids.is_some_and(|n| n > 0),
            _ => self.text(field).is_some_and(|value| !value.trim().is_empty()),
        }
    }

    pub fn text(&self, field: ActivityField) -> Option<&str> {
        match field {
            ActivityField::Name => self.name.as_deref(),
            ActivityField::ActivityType => self.activity_type.as_deref(),
            ActivityField::Location => self.location.as_deref(),
            ActivityField::NumberOfKids => None,
            ActivityField::YouthHouse => self.youth_house.as_deref(),
            ActivityField::Date => self.date.as_deref(),
        }
    }

    /// Rendered value, numbers included, for prompts and summaries.
    pub fn display_value(&self, field: ActivityField) -> Option<String> {
        if !self.has(field) {
            return None;
        }
        match field {
            ActivityField::NumberOfKids => self.number_of_kids.map(|n| n.to_string()),
            _ => self.text(field).map(|value| value.trim().to_string()),
        }
    }

    /// Sets a text slot. Blank values are ignored; `NumberOfKids` is parsed
    /// and range-checked.
    pub fn set_text(&mut self, field: ActivityField, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return;
        }
        let owned = Some(value.to_string());
        match field {
            ActivityField::Name => self.name = owned,
            ActivityField::ActivityType => self.activity_type = owned,
            ActivityField::Location => self.location = owned,
            ActivityField::NumberOfKids => {
                if let Some(count) = value.parse::<u32>().ok().and_then(accept_kid_count) {
                    self.number_of_kids = Some(count);
                }
            }
            ActivityField::YouthHouse => self.youth_house = owned,
            ActivityField::Date => self.date = owned,
        }
    }

    pub fn set_kids(&mut self, count: u32) {
        if let Some(count) = accept_kid_count(count) {
            self.number_of_kids = Some(count);
        }
    }

    pub fn clear(&mut self, field: ActivityField) {
        match field {
            ActivityField::Name => self.name = None,
            ActivityField::ActivityType => self.activity_type = None,
            ActivityField::Location => self.location = None,
            ActivityField::NumberOfKids => self.number_of_kids = None,
            ActivityField::YouthHouse => self.youth_house = None,
            ActivityField::Date => self.date = None,
        }
    }

    /// Copies every filled slot of `other` over `self`; absent slots of
    /// `other` leave `self` untouched.
    pub fn overlay(&mut self, other: &ExtractionResult) {
        for field in ActivityField::ALL {
            if !other.has(field) {
                continue;
            }
            match field {
                ActivityField::NumberOfKids => {
                    if let Some(count) = other.number_of_kids {
                        self.set_kids(count);
                    }
                }
                _ => {
                    if let Some(value) = other.text(field) {
                        self.set_text(field, value);
                    }
                }
            }
        }
    }

    pub fn filled_fields(&self) -> Vec<ActivityField> {
        ActivityField::ALL.into_iter().filter(|field| self.has(*field)).collect()
    }
}

/// Accumulated state of the activity currently being described.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRecord {
    values: ExtractionResult,
}

impl ActivityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &ExtractionResult {
        &self.values
    }

    pub fn has(&self, field: ActivityField) -> bool {
        self.values.has(field)
    }

    pub fn display_value(&self, field: ActivityField) -> Option<String> {
        self.values.display_value(field)
    }

    pub fn name(&self) -> Option<&str> {
        self.values.text(ActivityField::Name).filter(|name| !name.trim().is_empty())
    }

    /// Last mention wins: fresh non-empty values replace old ones, absent
    /// values never erase what earlier turns filled.
    pub fn absorb(&mut self, turn: &ExtractionResult) {
        self.values.overlay(turn);
    }

    pub fn reset(&mut self) {
        self.values = ExtractionResult::default();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<ExtractionResult> for ActivityRecord {
    fn from(values: ExtractionResult) -> Self {
        let mut record = Self::default();
        record.absorb(&values);
        record
    }
}

/// Row handed to the append-only store. Column order is fixed by the
/// store's layout: name, date, activity type, location, kids, organization,
/// logged-at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub name: String,
    pub date: String,
    pub activity_type: String,
    pub location: String,
    pub number_of_kids: String,
    pub youth_house: String,
    pub logged_at: String,
}

impl ActivityRow {
    pub const COLUMNS: [&'static str; 7] = [
        "name",
        "date",
        "activity_type",
        "location",
        "number_of_kids",
        "youth_house",
        "logged_at",
    ];

    pub fn from_record(
        record: &ActivityRecord,
        logged_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let missing: Vec<ActivityField> =
            ActivityField::ALL.into_iter().filter(|field| !record.has(*field)).collect();
        if !missing.is_empty() {
            return Err(DomainError::IncompleteRecord { missing });
        }

        let value = |field| record.display_value(field).unwrap_or_default();
        Ok(Self {
            name: value(ActivityField::Name),
            date: value(ActivityField::Date),
            activity_type: value(ActivityField::ActivityType),
            location: value(ActivityField::Location),
            number_of_kids: value(ActivityField::NumberOfKids),
            youth_house: value(ActivityField::YouthHouse),
            logged_at: logged_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    pub fn values(&self) -> [&str; 7] {
        [
            &self.name,
            &self.date,
            &self.activity_type,
            &self.location,
            &self.number_of_kids,
            &self.youth_house,
            &self.logged_at,
        ]
    }
}
