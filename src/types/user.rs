//! User records
//!
//! On-disk shape of the user database: quota counters, chat memory and saved
//! design projects. Field names follow the JSON file format.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::message::Message;

/// Question limit granted to self-registered users
pub const SIGNUP_LIMIT: i64 = 20;

/// Question limit of the account seeded into a fresh database
pub const SEED_LIMIT: i64 = 50;

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: String,
    /// Total questions the user may ask
    #[serde(default, deserialize_with = "lenient_count")]
    pub limit: i64,
    /// Questions already consumed
    #[serde(default, deserialize_with = "lenient_count")]
    pub used: i64,
    /// Rolling chat memory (user/assistant pairs)
    #[serde(default, deserialize_with = "lenient_list")]
    pub memory: Vec<Message>,
    /// Saved design projects
    #[serde(default, deserialize_with = "lenient_list")]
    pub projects: Vec<Project>,
    /// Fields written by other tools are kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>, limit: i64) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            limit,
            used: 0,
            memory: Vec::new(),
            projects: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The account written when no user database exists yet
    pub fn seed() -> Self {
        Self::new("deneme@deneme.com", "1234", SEED_LIMIT)
    }

    pub fn remaining(&self) -> i64 {
        self.limit - self.used
    }

    pub fn has_quota(&self) -> bool {
        self.used < self.limit
    }

    pub fn quota(&self) -> Quota {
        Quota {
            email: self.email.clone(),
            limit: self.limit,
            used: self.used,
            remaining: self.remaining(),
        }
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }
}

// Hand-edited or older files carry floats, nulls and stray entries in these
// fields; they read as the nearest usable value instead of failing the record.

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Quota counters returned by the account endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub email: String,
    pub limit: i64,
    pub used: i64,
    /// May go negative when an admin lowers the limit below `used`
    pub remaining: i64,
}

/// A saved design-mode answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(rename = "rawDesignData", default)]
    pub raw_design_data: Value,
}

/// Listing entry for `GET /projects`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub summary: String,
}

impl From<&Project> for ProjectSummary {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            kind: p.kind.clone(),
            created_at: p.created_at.clone(),
            summary: p.summary.clone(),
        }
    }
}

/// Question packages sold through `/purchase`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Package {
    Mini,
    Pro,
    Bayi,
}

impl Package {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mini" => Some(Self::Mini),
            "pro" => Some(Self::Pro),
            "bayi" => Some(Self::Bayi),
            _ => None,
        }
    }

    /// Questions added to the user's limit
    pub fn credits(self) -> i64 {
        match self {
            Self::Mini => 50,
            Self::Pro => 200,
            Self::Bayi => 1000,
        }
    }
}
