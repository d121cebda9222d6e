//! Age bands for spending averages.
//!
//! The band table is a fixed, ordered list. Closed bands include both bounds;
//! the last band has no upper bound.

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A contiguous age interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBand {
    /// Inclusive lower bound.
    pub lower: i64,

    /// Inclusive upper bound, or `None` for an open-ended band.
    pub upper: Option<i64>,
}

/// The bands reported by the average-spending aggregation, in report order.
pub const AGE_BANDS: [AgeBand; 5] = [
    AgeBand::closed(18, 24),
    AgeBand::closed(25, 30),
    AgeBand::closed(31, 36),
    AgeBand::closed(37, 47),
    AgeBand::open(48),
];

impl AgeBand {
    /// A band with both bounds inclusive.
    #[must_use]
    pub const fn closed(lower: i64, upper: i64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    /// A band with an inclusive lower bound and no upper bound.
    #[must_use]
    pub const fn open(lower: i64) -> Self {
        Self { lower, upper: None }
    }

    /// Report label: `"start-end"` for closed bands, `">start"` for open ones.
    #[must_use]
    pub fn label(&self) -> String {
        match self.upper {
            Some(upper) => format!("{}-{}", self.lower, upper),
            None => format!(">{}", self.lower),
        }
    }

    /// Whether `age` falls inside the band.
    #[must_use]
    pub fn contains(&self, age: i64) -> bool {
        age >= self.lower && self.upper.map_or(true, |upper| age <= upper)
    }
}

/// Average spending for one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandAverage {
    /// The band.
    pub band: AgeBand,

    /// Average amount per spending event. Zero when the band is empty.
    pub average: Decimal,
}

impl BandAverage {
    /// Compute the band average from the summed amounts and the number of events.
    ///
    /// The quotient is kept at full decimal precision; nothing is rounded to
    /// cents. An empty band (`count == 0`) averages to zero.
    #[must_use]
    pub fn from_totals(band: AgeBand, sum: Decimal, count: i64) -> Self {
        let average = if count <= 0 {
            Decimal::ZERO
        } else {
            (sum / Decimal::from(count)).normalize()
        };
        Self { band, average }
    }
}

/// Averages for every band in [`AGE_BANDS`], in band order.
///
/// Serializes as a JSON object mapping band labels to averages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgeBandReport {
    bands: Vec<BandAverage>,
}

impl AgeBandReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a band result.
    pub fn push(&mut self, average: BandAverage) {
        self.bands.push(average);
    }

    /// Look up the average for a band label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<Decimal> {
        self.bands
            .iter()
            .find(|entry| entry.band.label() == label)
            .map(|entry| entry.average)
    }

    /// Iterate over band results in order.
    pub fn iter(&self) -> impl Iterator<Item = &BandAverage> {
        self.bands.iter()
    }

    /// Number of bands in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether the report holds no bands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl Serialize for AgeBandReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bands.len()))?;
        for entry in &self.bands {
            map.serialize_entry(&entry.band.label(), &entry.average)?;
        }
        map.end()
    }
}
