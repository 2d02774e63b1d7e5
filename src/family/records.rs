//! Flat person records as sent by a loader, resolved into a [`People`] arena.
//!
//! Records reference each other by string id. Resolution happens in two
//! passes: first every record becomes a person, then mother/father/partner
//! ids are linked.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::person::{Gender, People, PersonId};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub deceased: bool,
    pub mother: Option<String>,
    pub father: Option<String>,
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordErrorKind {
    MissingId,
    DuplicateId,
    UnknownReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub kind: RecordErrorKind,
    /// The id that failed to resolve (or the duplicated one).
    pub id: String,
    /// Index of the offending record.
    pub index: usize,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RecordErrorKind::MissingId => write!(f, "record #{} has no id", self.index),
            RecordErrorKind::DuplicateId => {
                write!(f, "record #{} duplicates person id '{}'", self.index, self.id)
            }
            RecordErrorKind::UnknownReference => {
                write!(f, "record #{} references unknown person id '{}'", self.index, self.id)
            }
        }
    }
}
impl std::error::Error for RecordError {}

impl People {
    /// Build the arena from records. Empty reference strings mean "none".
    pub fn from_records(records: &[PersonRecord]) -> Result<People, RecordError> {
        let mut people = People::new();
        let mut by_id: HashMap<&str, PersonId> = HashMap::new();

        // First pass - create everyone without relations.
        for (index, rec) in records.iter().enumerate() {
            let id = rec.id.trim();
            if id.is_empty() {
                return Err(RecordError { kind: RecordErrorKind::MissingId, id: String::new(), index });
            }
            if by_id.contains_key(id) {
                return Err(RecordError { kind: RecordErrorKind::DuplicateId, id: id.to_string(), index });
            }
            let pid = people.add(&rec.first_name, &rec.last_name, rec.gender);
            if let Some(p) = people.get_mut(pid) {
                p.birth_year = rec.birth_year;
                p.death_year = rec.death_year;
                p.deceased = rec.deceased || rec.death_year.is_some();
            }
            by_id.insert(id, pid);
        }

        let resolve = |index: usize, id: Option<&String>| -> Result<Option<PersonId>, RecordError> {
            let id = match id.map(|s| s.trim()) {
                Some(id) if !id.is_empty() => id,
                _ => return Ok(None),
            };
            by_id.get(id).copied().map(Some).ok_or_else(|| RecordError {
                kind: RecordErrorKind::UnknownReference,
                id: id.to_string(),
                index,
            })
        };

        // Second pass - relations.
        for (index, rec) in records.iter().enumerate() {
            let pid = PersonId(index);
            if let Some(mother) = resolve(index, rec.mother.as_ref())? {
                people.set_mother(pid, mother);
            }
            if let Some(father) = resolve(index, rec.father.as_ref())? {
                people.set_father(pid, father);
            }
            for partner in &rec.partners {
                if let Some(partner) = resolve(index, Some(partner))? {
                    people.add_partner(pid, partner);
                }
            }
        }

        Ok(people)
    }
}
