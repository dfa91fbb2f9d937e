use crate::types::DocumentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub subject: String,
    pub score: i32,
    pub date: NaiveDate,
}

impl Mark {
    pub fn new(subject: impl Into<String>, score: i32, date: NaiveDate) -> Self {
        Self { subject: subject.into(), score, date }
    }
}

/// A student with the marks recorded so far, in entry order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: DocumentId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

impl Student {
    pub fn new(id: DocumentId, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self { id, name: name.into(), phone: phone.into(), marks: Vec::new() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdName {
    pub id: DocumentId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdNameMarks {
    pub id: DocumentId,
    pub name: String,
    pub marks: Vec<Mark>,
}

/// One score range of a distribution, bounds inclusive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarksBucket {
    pub min: i32,
    pub max: i32,
    pub count: u64,
}
