use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// The fixed set of emoji a reader can react with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Heart,
    Unicorn,
    MindBlown,
    RaisedHands,
    Fire,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reaction type: {0}")]
pub struct UnknownKind(pub String);

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Heart,
        ReactionKind::Unicorn,
        ReactionKind::MindBlown,
        ReactionKind::RaisedHands,
        ReactionKind::Fire,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Heart => "heart",
            ReactionKind::Unicorn => "unicorn",
            ReactionKind::MindBlown => "mind_blown",
            ReactionKind::RaisedHands => "raised_hands",
            ReactionKind::Fire => "fire",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl ToSql for ReactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: UnknownKind| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_kind() {
        for kind in ReactionKind::ALL {
            assert_eq!(kind.as_str().parse::<ReactionKind>(), Ok(kind));
        }
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert_eq!(
            "thumbs_up".parse::<ReactionKind>(),
            Err(UnknownKind("thumbs_up".into()))
        );
        assert!("Heart".parse::<ReactionKind>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&ReactionKind::MindBlown).unwrap(),
            "\"mind_blown\""
        );
        let kind: ReactionKind = serde_json::from_str("\"raised_hands\"").unwrap();
        assert_eq!(kind, ReactionKind::RaisedHands);
    }
}
