//! Static US reference tables shared by several datasets.

use crate::errors::Result;
use crate::sampler::WeightedSampler;

/// States weighted by approximate share of population.
pub const STATE_WEIGHTS: &[(&str, f64)] = &[
    ("CA", 12.0),
    ("TX", 9.0),
    ("FL", 6.5),
    ("NY", 6.0),
    ("PA", 4.0),
    ("IL", 3.9),
    ("OH", 3.6),
    ("GA", 3.3),
    ("NC", 3.2),
    ("MI", 3.1),
    ("NJ", 2.8),
    ("VA", 2.6),
    ("WA", 2.3),
    ("AZ", 2.2),
    ("MA", 2.1),
    ("TN", 2.1),
    ("IN", 2.0),
    ("MO", 1.9),
    ("MD", 1.9),
    ("WI", 1.8),
    ("CO", 1.7),
    ("MN", 1.7),
    ("SC", 1.6),
    ("AL", 1.5),
    ("LA", 1.4),
    ("KY", 1.4),
    ("OR", 1.3),
    ("OK", 1.2),
    ("CT", 1.1),
    ("UT", 1.0),
    ("IA", 1.0),
    ("NV", 0.9),
    ("AR", 0.9),
    ("MS", 0.9),
    ("KS", 0.9),
    ("NM", 0.6),
    ("NE", 0.6),
    ("WV", 0.6),
    ("ID", 0.5),
    ("HI", 0.4),
    ("NH", 0.4),
    ("ME", 0.4),
    ("MT", 0.3),
    ("RI", 0.3),
    ("DE", 0.3),
    ("SD", 0.3),
    ("ND", 0.2),
    ("AK", 0.2),
    ("VT", 0.2),
    ("WY", 0.2),
];

/// State codes in alphabetical order of state name.
pub const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

const MAJOR_CITIES: &[(&str, &[&str])] = &[
    ("CA", &["Los Angeles", "San Diego", "San Jose", "San Francisco", "Fresno", "Sacramento"]),
    ("TX", &["Houston", "San Antonio", "Dallas", "Austin", "Fort Worth", "El Paso"]),
    ("FL", &["Jacksonville", "Miami", "Tampa", "Orlando", "St Petersburg"]),
    ("NY", &["New York", "Buffalo", "Rochester", "Yonkers", "Syracuse"]),
    ("PA", &["Philadelphia", "Pittsburgh", "Allentown", "Erie", "Reading"]),
    ("IL", &["Chicago", "Aurora", "Naperville", "Joliet", "Rockford"]),
    ("OH", &["Columbus", "Cleveland", "Cincinnati", "Toledo", "Akron"]),
    ("GA", &["Atlanta", "Augusta", "Columbus", "Savannah", "Athens"]),
    ("NC", &["Charlotte", "Raleigh", "Greensboro", "Durham", "Winston-Salem"]),
    ("MI", &["Detroit", "Grand Rapids", "Warren", "Sterling Heights", "Ann Arbor"]),
];

const ZIP_PREFIXES: &[(&str, &[char])] = &[
    ("CA", &['9']),
    ("TX", &['7', '8']),
    ("FL", &['3']),
    ("NY", &['1']),
    ("PA", &['1']),
    ("IL", &['6']),
    ("OH", &['4']),
    ("GA", &['3']),
    ("NC", &['2']),
    ("MI", &['4']),
];

const ANY_ZIP_PREFIX: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

pub const STREET_NAMES: &[&str] = &[
    "Main", "Oak", "Maple", "Cedar", "Elm", "Washington", "Lake", "Hill", "Park", "Pine", "First",
    "Second", "Third", "Broadway", "Market", "Church", "Spring", "Center", "River", "Sunset",
    "Madison", "Lincoln", "Jefferson", "Franklin", "Jackson", "Wilson", "Highland", "Forest",
    "Valley", "Ridge", "Summit", "College", "University", "Commerce",
];

pub const STREET_TYPES: &[&str] = &["St", "Ave", "Blvd", "Dr", "Rd", "Ln", "Way", "Pkwy", "Ct"];

const CITY_PREFIXES: &[&str] = &[
    "Spring", "Green", "Fair", "Clear", "River", "Lake", "Mount", "New", "West", "East", "North",
    "South", "Port", "Fort", "Saint",
];

const CITY_SUFFIXES: &[&str] = &[
    "field", "ville", "town", "dale", "wood", "view", "port", "land", "brook", "side", "ford",
    "burg", "ton", "city", "haven",
];

pub fn major_cities(state: &str) -> Option<&'static [&'static str]> {
    MAJOR_CITIES
        .iter()
        .find(|(code, _)| *code == state)
        .map(|(_, cities)| *cities)
}

/// Synthetic town name, either joined (`Greenville`) or spaced (`Green Ville`).
pub fn synthetic_city(sampler: &mut WeightedSampler) -> Result<String> {
    let prefix = *sampler.choose(CITY_PREFIXES)?;
    let suffix = *sampler.choose(CITY_SUFFIXES)?;
    if sampler.bernoulli(0.5) {
        Ok(format!("{prefix}{suffix}"))
    } else {
        Ok(format!("{prefix} {}", capitalize(suffix)))
    }
}

/// Five-digit ZIP whose leading digit follows the state where known.
pub fn zip_code(state: &str, sampler: &mut WeightedSampler) -> Result<String> {
    let prefixes = ZIP_PREFIXES
        .iter()
        .find(|(code, _)| *code == state)
        .map(|(_, prefixes)| *prefixes)
        .unwrap_or(ANY_ZIP_PREFIX);
    let lead = *sampler.choose(prefixes)?;
    Ok(format!("{lead}{}", sampler.digits(4)))
}

/// Area code, exchange and line number of a US phone.
pub fn phone_parts(sampler: &mut WeightedSampler) -> Result<(i64, i64, i64)> {
    Ok((
        sampler.sample_int(200, 999)?,
        sampler.sample_int(200, 999)?,
        sampler.sample_int(1_000, 9_999)?,
    ))
}

/// Ten-digit NPI without a leading zero.
pub fn npi(sampler: &mut WeightedSampler) -> Result<String> {
    Ok(sampler
        .sample_int(1_000_000_000, 9_999_999_999)?
        .to_string())
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tables_agree() {
        assert_eq!(STATE_WEIGHTS.len(), STATE_CODES.len());
        for (code, _) in STATE_WEIGHTS {
            assert!(STATE_CODES.contains(code), "{code} missing from codes");
        }
    }

    #[test]
    fn zip_code_follows_state_prefix() {
        let mut sampler = WeightedSampler::seeded(3);
        for _ in 0..20 {
            let zip = zip_code("CA", &mut sampler).expect("zip");
            assert_eq!(zip.len(), 5);
            assert!(zip.starts_with('9'));
        }
    }

    #[test]
    fn capitalize_handles_empty() {
        assert_eq!(capitalize("ville"), "Ville");
        assert_eq!(capitalize(""), "");
    }
}
