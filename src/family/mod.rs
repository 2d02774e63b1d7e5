mod person;
mod records;
mod tree;

pub use person::{Gender, People, Person, PersonId};
pub use records::{PersonRecord, RecordError, RecordErrorKind};
pub use tree::{Family, FamilyId, FamilyTree};
