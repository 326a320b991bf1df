//! # Sections
//!
//! The part of an HTTP exchange a schema governs. Validators sometimes use
//! internal names (`querystring`); parsing folds those onto the public name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConformError;

/// A request section, or the response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[serde(alias = "querystring")]
    Query,
    Params,
    Body,
    Headers,
    Response,
}

impl Section {
    /// Every section, in reporting order.
    pub const ALL: [Section; 5] = [
        Section::Query,
        Section::Params,
        Section::Body,
        Section::Headers,
        Section::Response,
    ];

    /// The public section name used as the output key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Query => "query",
            Section::Params => "params",
            Section::Body => "body",
            Section::Headers => "headers",
            Section::Response => "response",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ConformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" | "querystring" => Ok(Section::Query),
            "params" => Ok(Section::Params),
            "body" => Ok(Section::Body),
            "headers" => Ok(Section::Headers),
            "response" => Ok(Section::Response),
            other => Err(ConformError::UnknownSection(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn querystring_is_an_alias_for_query() {
        assert_eq!("querystring".parse::<Section>().unwrap(), Section::Query);
        assert_eq!("querystring".parse::<Section>().unwrap().as_str(), "query");
    }

    #[test]
    fn names_round_trip() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = "cookies".parse::<Section>().unwrap_err();
        assert_eq!(err, ConformError::UnknownSection("cookies".into()));
        assert!(err.to_string().contains("cookies"));
    }

    #[test]
    fn serde_uses_public_names() {
        let section: Section = serde_json::from_str("\"querystring\"").unwrap();
        assert_eq!(section, Section::Query);
        assert_eq!(serde_json::to_string(&Section::Headers).unwrap(), "\"headers\"");
    }
}
