//! Activity kind enum for type-safe activity classification.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of synchronized activity.
///
/// Together with the external activity id this forms the natural key of an
/// activity record.
#[derive(
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[sea_orm(string_value = "commit")]
    Commit,
    #[sea_orm(string_value = "issue")]
    Issue,
    #[sea_orm(string_value = "merge_request")]
    MergeRequest,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "push")]
    Push,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityKind::Commit => "commit",
            ActivityKind::Issue => "issue",
            ActivityKind::MergeRequest => "merge_request",
            ActivityKind::Review => "review",
            ActivityKind::Comment => "comment",
            ActivityKind::Push => "push",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commit" => Ok(ActivityKind::Commit),
            "issue" => Ok(ActivityKind::Issue),
            "merge_request" | "merge-request" | "mr" => Ok(ActivityKind::MergeRequest),
            "review" => Ok(ActivityKind::Review),
            "comment" => Ok(ActivityKind::Comment),
            "push" => Ok(ActivityKind::Push),
            _ => Err(format!("Unknown activity kind: {}", s)),
        }
    }
}
