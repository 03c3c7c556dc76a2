//! Search request types and validation of raw caller input.
//!
//! Times of day are expressed the way the upstream search API expects them:
//! half-hour slot indices counted from midnight, so slot `10` is 05:00 and
//! slot `42` is 21:00.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Inclusive pair of half-hour slot indices bounding tee-off times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub min: u8,
    pub max: u8,
}

impl TimeWindow {
    /// 05:00 through 21:00, the window the platform's own web app sends.
    pub const FULL_DAY: TimeWindow = TimeWindow { min: 10, max: 42 };

    /// Midnight at the end of the day.
    pub const LAST_SLOT: u8 = 48;

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidField`] if `min > max` or `max` lies past
    /// the end of the day (slot 48).
    pub fn new(min: u8, max: u8) -> Result<Self, CoreError> {
        if min > max || max > Self::LAST_SLOT {
            return Err(CoreError::InvalidField {
                field: "timeWindow",
                reason: format!("expected 0 <= min <= max <= 48, got {min}..{max}"),
            });
        }
        Ok(Self { min, max })
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::FULL_DAY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    #[must_use]
    pub fn window(self) -> TimeWindow {
        match self {
            TimeOfDay::Morning => TimeWindow { min: 10, max: 22 },
            TimeOfDay::Midday => TimeWindow { min: 20, max: 28 },
            TimeOfDay::Afternoon => TimeWindow { min: 24, max: 34 },
            TimeOfDay::Evening => TimeWindow { min: 32, max: 42 },
        }
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "midday" => Ok(TimeOfDay::Midday),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            other => Err(CoreError::InvalidField {
                field: "timeOfDay",
                reason: format!("unknown time of day \"{other}\""),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolesPreference {
    #[default]
    Any,
    Nine,
    Eighteen,
}

impl HolesPreference {
    /// Hole-count code used by the upstream search body.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            HolesPreference::Nine => 1,
            HolesPreference::Eighteen => 2,
            HolesPreference::Any => 3,
        }
    }
}

impl std::str::FromStr for HolesPreference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "" => Ok(HolesPreference::Any),
            "9" | "nine" => Ok(HolesPreference::Nine),
            "18" | "eighteen" => Ok(HolesPreference::Eighteen),
            other => Err(CoreError::InvalidField {
                field: "holes",
                reason: format!("expected any, 9 or 18, got \"{other}\""),
            }),
        }
    }
}

/// Configured fallbacks for parameters a caller may omit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchDefaults {
    pub radius_miles: u32,
    pub players: u32,
    pub time_window: TimeWindow,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            radius_miles: 20,
            players: 2,
            time_window: TimeWindow::FULL_DAY,
        }
    }
}

/// A validated, immutable search for one date and location.
///
/// Built once per acquisition via [`SearchRequest::new`] and the `with_*`
/// adjusters; no accessor hands out mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    radius_miles: u32,
    players: u32,
    holes: HolesPreference,
    time_of_day: Option<TimeOfDay>,
    default_window: TimeWindow,
}

impl SearchRequest {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidField`] when coordinates are out of range
    /// or `players` is zero.
    pub fn new(
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
        players: u32,
    ) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::InvalidField {
                field: "lat",
                reason: format!("{latitude} is outside -90..=90"),
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::InvalidField {
                field: "lon",
                reason: format!("{longitude} is outside -180..=180"),
            });
        }
        if players == 0 {
            return Err(CoreError::InvalidField {
                field: "players",
                reason: "must be a positive integer".to_owned(),
            });
        }
        Ok(Self {
            date,
            latitude,
            longitude,
            radius_miles: SearchDefaults::default().radius_miles,
            players,
            holes: HolesPreference::Any,
            time_of_day: None,
            default_window: TimeWindow::FULL_DAY,
        })
    }

    #[must_use]
    pub fn with_radius_miles(mut self, radius_miles: u32) -> Self {
        self.radius_miles = radius_miles;
        self
    }

    #[must_use]
    pub fn with_holes(mut self, holes: HolesPreference) -> Self {
        self.holes = holes;
        self
    }

    #[must_use]
    pub fn with_time_of_day(mut self, time_of_day: Option<TimeOfDay>) -> Self {
        self.time_of_day = time_of_day;
        self
    }

    /// Window used when no time of day is requested.
    #[must_use]
    pub fn with_default_window(mut self, window: TimeWindow) -> Self {
        self.default_window = window;
        self
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn radius_miles(&self) -> u32 {
        self.radius_miles
    }

    #[must_use]
    pub fn players(&self) -> u32 {
        self.players
    }

    #[must_use]
    pub fn holes(&self) -> HolesPreference {
        self.holes
    }

    #[must_use]
    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        self.time_of_day
    }

    /// The requested time-of-day bounds, or the default window.
    #[must_use]
    pub fn time_window(&self) -> TimeWindow {
        self.time_of_day
            .map_or(self.default_window, TimeOfDay::window)
    }
}

/// Raw query parameters as received at the service boundary.
///
/// Everything is optional text so that missing and malformed input can be
/// reported together as a single validation failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub date: Option<String>,
    pub players: Option<String>,
    #[serde(alias = "latitude")]
    pub lat: Option<String>,
    #[serde(alias = "longitude", alias = "lng")]
    pub lon: Option<String>,
    pub radius: Option<String>,
    pub time_of_day: Option<String>,
    pub holes: Option<String>,
}

impl SearchQuery {
    /// Validate the query and build a [`SearchRequest`].
    ///
    /// # Errors
    ///
    /// - [`CoreError::MissingFields`] listing every absent required field
    ///   (`date`, `players`, `lat`, `lon`).
    /// - [`CoreError::InvalidField`] for the first field that fails to parse.
    pub fn into_request(self, defaults: &SearchDefaults) -> Result<SearchRequest, CoreError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let date = present(&self.date);
        let players = present(&self.players);
        let lat = present(&self.lat);
        let lon = present(&self.lon);

        let missing: Vec<&'static str> = [
            ("date", date.is_none()),
            ("players", players.is_none()),
            ("lat", lat.is_none()),
            ("lon", lon.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(CoreError::MissingFields(missing));
        }

        let (Some(date), Some(players), Some(lat), Some(lon)) = (date, players, lat, lon) else {
            return Err(CoreError::MissingFields(vec!["date", "players", "lat", "lon"]));
        };

        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            CoreError::InvalidField {
                field: "date",
                reason: format!("expected YYYY-MM-DD: {e}"),
            }
        })?;
        let players = parse_number::<u32>("players", &players)?;
        let latitude = parse_number::<f64>("lat", &lat)?;
        let longitude = parse_number::<f64>("lon", &lon)?;

        let radius_miles = match present(&self.radius) {
            Some(raw) => {
                let radius = parse_number::<u32>("radius", &raw)?;
                if radius == 0 {
                    return Err(CoreError::InvalidField {
                        field: "radius",
                        reason: "must be a positive integer".to_owned(),
                    });
                }
                radius
            }
            None => defaults.radius_miles,
        };

        let time_of_day = present(&self.time_of_day)
            .map(|raw| raw.parse::<TimeOfDay>())
            .transpose()?;
        let holes = present(&self.holes)
            .map(|raw| raw.parse::<HolesPreference>())
            .transpose()?
            .unwrap_or_default();

        Ok(SearchRequest::new(date, latitude, longitude, players)?
            .with_radius_miles(radius_miles)
            .with_holes(holes)
            .with_time_of_day(time_of_day)
            .with_default_window(defaults.time_window))
    }
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| CoreError::InvalidField {
        field,
        reason: format!("\"{raw}\": {e}"),
    })
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
