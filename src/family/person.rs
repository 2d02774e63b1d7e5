//! People and their relations.
//!
//! People live in a [`People`] arena and reference each other by
//! [`PersonId`]. Relations are kept symmetric by the mutators here:
//! `set_mother`/`set_father` also update the parent's `children`, and
//! `add_partner` links both sides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PersonId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub pid: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub deceased: bool,
    pub mother: Option<PersonId>,
    pub father: Option<PersonId>,
    /// Insertion ordered, no duplicates.
    pub partners: Vec<PersonId>,
    /// Insertion ordered, no duplicates.
    pub children: Vec<PersonId>,
}

impl Person {
    /// Name tokens joined with a space. Empty for a person without a name.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.full_name().is_empty()
    }

    pub fn has_parents(&self) -> bool {
        self.mother.is_some() || self.father.is_some()
    }

    /// Life span label, e.g. `1920-1990`, `1920`, `1920-?`. Empty without years.
    pub fn dates(&self) -> String {
        match (self.birth_year, self.death_year) {
            (Some(birth), Some(death)) => format!("{}-{}", birth, death),
            (Some(birth), None) if self.deceased => format!("{}-?", birth),
            (Some(birth), None) => birth.to_string(),
            (None, Some(death)) => format!("?-{}", death),
            (None, None) => String::new(),
        }
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.full_name();
        match (name.is_empty(), self.birth_year) {
            (false, Some(year)) => write!(f, "{} {}", name, year),
            (true, Some(year)) => write!(f, "{}", year),
            _ => write!(f, "{}", name),
        }
    }
}

/// Arena of people.
#[derive(Debug, Clone, Default)]
pub struct People {
    persons: Vec<Person>,
}

impl People {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, first_name: &str, last_name: &str, gender: Gender) -> PersonId {
        let pid = PersonId(self.persons.len());
        self.persons.push(Person {
            pid,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            gender,
            birth_year: None,
            death_year: None,
            deceased: false,
            mother: None,
            father: None,
            partners: Vec::new(),
            children: Vec::new(),
        });
        pid
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn get(&self, pid: PersonId) -> Option<&Person> {
        self.persons.get(pid.0)
    }

    pub fn get_mut(&mut self, pid: PersonId) -> Option<&mut Person> {
        self.persons.get_mut(pid.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.persons.iter()
    }

    pub fn set_mother(&mut self, child: PersonId, mother: PersonId) {
        self.persons[child.0].mother = Some(mother);
        push_unique(&mut self.persons[mother.0].children, child);
    }

    pub fn set_father(&mut self, child: PersonId, father: PersonId) {
        self.persons[child.0].father = Some(father);
        push_unique(&mut self.persons[father.0].children, child);
    }

    pub fn add_partner(&mut self, a: PersonId, b: PersonId) {
        if a == b {
            return;
        }
        push_unique(&mut self.persons[a.0].partners, b);
        push_unique(&mut self.persons[b.0].partners, a);
    }

    /// Breadth-first list of `pid` and everyone below it.
    pub fn self_and_descendants(&self, pid: PersonId) -> Vec<PersonId> {
        let mut result = vec![pid];
        let mut seen = std::collections::HashSet::from([pid]);
        let mut wp = 0;
        while wp < result.len() {
            let node = result[wp];
            wp += 1;
            for &child in &self.persons[node.0].children {
                if seen.insert(child) {
                    result.push(child);
                }
            }
        }
        result
    }

    /// Drop every person without a name and compact the arena.
    ///
    /// Children lose a mother/father that was dropped, partners lose the
    /// reciprocal link. Surviving ids are renumbered in order.
    pub fn prune_empty(self) -> People {
        let mut remap: Vec<Option<PersonId>> = Vec::with_capacity(self.persons.len());
        let mut next = 0;
        for p in &self.persons {
            if p.is_empty() {
                remap.push(None);
            } else {
                remap.push(Some(PersonId(next)));
                next += 1;
            }
        }

        let map = |pid: PersonId| remap[pid.0];
        let persons = self
            .persons
            .iter()
            .filter_map(|p| {
                let pid = map(p.pid)?;
                Some(Person {
                    pid,
                    mother: p.mother.and_then(map),
                    father: p.father.and_then(map),
                    partners: p.partners.iter().filter_map(|&q| map(q)).collect(),
                    children: p.children.iter().filter_map(|&c| map(c)).collect(),
                    ..p.clone()
                })
            })
            .collect();
        People { persons }
    }
}

impl std::ops::Index<PersonId> for People {
    type Output = Person;

    fn index(&self, pid: PersonId) -> &Person {
        &self.persons[pid.0]
    }
}

fn push_unique(list: &mut Vec<PersonId>, pid: PersonId) {
    if !list.contains(&pid) {
        list.push(pid);
    }
}
