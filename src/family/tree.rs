// Family tree: People arena -> rooted tree of Families.
//
// What this does:
// - Picks a root among people without mother and father (the candidate with
//   the most descendants)
// - Walks breadth-first from the root, creating one Family per partner plus
//   one for children without a known partner
// - Indexes families per person (main or alt), in creation order
// - Records every reachable person in BFS order
//
// The tree owns the arena it was built from; layout engines borrow it
// through an Rc.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use super::person::{People, Person, PersonId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FamilyId(pub usize);

/// A parental unit: `main`, an optional partner `alt`, and their children.
#[derive(Debug, Clone, Serialize)]
pub struct Family {
    pub fid: FamilyId,
    /// Family that produced `main` as a child. None for the root's families.
    pub parent_family: Option<FamilyId>,
    pub main: PersonId,
    pub alt: Option<PersonId>,
    pub children: Vec<PersonId>,
}

impl Family {
    pub fn contains(&self, pid: PersonId) -> bool {
        self.main == pid || self.alt == Some(pid)
    }
}

#[derive(Debug, Clone)]
pub struct FamilyTree {
    people: People,
    root: PersonId,
    families: Vec<Family>,
    person_families: HashMap<PersonId, Vec<FamilyId>>,
    members: Vec<PersonId>,
}

impl FamilyTree {
    /// Build the tree of the parentless person with the most descendants.
    ///
    /// Returns None when there is nobody to root a tree at.
    pub fn from_people(people: People) -> Option<FamilyTree> {
        if people.is_empty() {
            return None;
        }

        let mut best: Option<(PersonId, usize)> = None;
        for person in people.iter().filter(|p| !p.has_parents()) {
            let size = people.self_and_descendants(person.pid).len();
            // Strictly greater: the first candidate wins ties.
            if best.is_none_or(|(_, best_size)| size > best_size) {
                best = Some((person.pid, size));
            }
        }

        let (root, _) = best?;
        let index = TreeIndex::build(&people, root);
        debug!(
            root = index.root.0,
            families = index.families.len(),
            members = index.members.len(),
            people = people.len(),
            "built family tree"
        );
        Some(FamilyTree {
            people,
            root: index.root,
            families: index.families,
            person_families: index.person_families,
            members: index.members,
        })
    }

    pub fn root(&self) -> PersonId {
        self.root
    }

    pub fn people(&self) -> &People {
        &self.people
    }

    pub fn person(&self, pid: PersonId) -> &Person {
        &self.people[pid]
    }

    /// Number of distinct families.
    pub fn size(&self) -> usize {
        self.families.len()
    }

    pub fn family(&self, fid: FamilyId) -> &Family {
        &self.families[fid.0]
    }

    pub fn all_families(&self) -> &[Family] {
        &self.families
    }

    /// Families `pid` appears in as main or alt, in creation order.
    pub fn families(&self, pid: PersonId) -> impl Iterator<Item = &Family> {
        self.person_families
            .get(&pid)
            .into_iter()
            .flatten()
            .map(|fid| &self.families[fid.0])
    }

    /// Families headed by `pid`.
    pub fn main_families(&self, pid: PersonId) -> impl Iterator<Item = &Family> {
        self.families(pid).filter(move |f| f.main == pid)
    }

    /// Children across every family headed by `pid`, family order first.
    pub fn children_of(&self, pid: PersonId) -> impl Iterator<Item = PersonId> {
        self.main_families(pid).flat_map(|f| f.children.iter().copied())
    }

    /// True iff `pid` is the main (not the alt) of its first family.
    pub fn is_family_main(&self, pid: PersonId) -> bool {
        self.families(pid).next().is_some_and(|f| f.main == pid)
    }

    /// Everyone reachable from the root, breadth-first.
    pub fn members(&self) -> &[PersonId] {
        &self.members
    }

    pub fn contains(&self, pid: PersonId) -> bool {
        self.person_families.contains_key(&pid)
    }
}

/// Families built from one root candidate.
struct TreeIndex {
    root: PersonId,
    families: Vec<Family>,
    person_families: HashMap<PersonId, Vec<FamilyId>>,
    members: Vec<PersonId>,
}

impl TreeIndex {
    fn build(people: &People, root: PersonId) -> TreeIndex {
        let mut index = TreeIndex {
            root,
            families: Vec::new(),
            person_families: HashMap::new(),
            members: Vec::new(),
        };
        // Members so far. A partner can be seen long before it is dequeued
        // as somebody's child, so this is kept apart from `queued`.
        let mut seen: HashSet<PersonId> = HashSet::new();
        let mut queued: HashSet<PersonId> = HashSet::from([root]);
        let mut claimed: HashSet<PersonId> = HashSet::new();
        let mut queue: VecDeque<(PersonId, Option<FamilyId>)> = VecDeque::from([(root, None)]);

        while let Some((pid, parent_family)) = queue.pop_front() {
            let person = &people[pid];
            if seen.insert(pid) {
                index.members.push(pid);
            }

            for &partner in &person.partners {
                // The couple already exists with the partner as main.
                if index.families(pid).any(|f| f.main == partner && f.alt == Some(pid)) {
                    continue;
                }
                let children: Vec<PersonId> = people[partner]
                    .children
                    .iter()
                    .copied()
                    .filter(|c| !claimed.contains(c) && *c != root)
                    .collect();
                let fid = index.add_family(parent_family, pid, Some(partner), children);
                if seen.insert(partner) {
                    index.members.push(partner);
                }
                index.claim_children(fid, &mut claimed, &mut queued, &mut queue);
            }

            let remaining: Vec<PersonId> = person
                .children
                .iter()
                .copied()
                .filter(|c| !claimed.contains(c) && *c != root)
                .collect();
            if person.partners.is_empty() || !remaining.is_empty() {
                let fid = index.add_family(parent_family, pid, None, remaining);
                index.claim_children(fid, &mut claimed, &mut queued, &mut queue);
            }
        }

        index
    }

    fn families(&self, pid: PersonId) -> impl Iterator<Item = &Family> {
        self.person_families
            .get(&pid)
            .into_iter()
            .flatten()
            .map(|fid| &self.families[fid.0])
    }

    fn add_family(
        &mut self,
        parent_family: Option<FamilyId>,
        main: PersonId,
        alt: Option<PersonId>,
        children: Vec<PersonId>,
    ) -> FamilyId {
        let fid = FamilyId(self.families.len());
        self.families.push(Family { fid, parent_family, main, alt, children });
        self.person_families.entry(main).or_default().push(fid);
        if let Some(alt) = alt {
            self.person_families.entry(alt).or_default().push(fid);
        }
        fid
    }

    fn claim_children(
        &self,
        fid: FamilyId,
        claimed: &mut HashSet<PersonId>,
        queued: &mut HashSet<PersonId>,
        queue: &mut VecDeque<(PersonId, Option<FamilyId>)>,
    ) {
        for &child in &self.families[fid.0].children {
            claimed.insert(child);
            if queued.insert(child) {
                queue.push_back((child, Some(fid)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::person::Gender;

    #[test]
    fn test_from_people_empty() {
        assert!(FamilyTree::from_people(People::new()).is_none());
    }

    #[test]
    fn test_single_person_tree() {
        let mut people = People::new();
        let a = people.add("Anna", "Berg", Gender::Female);
        let tree = FamilyTree::from_people(people).unwrap();
        assert_eq!(tree.root(), a);
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.members(), &[a]);
        assert!(tree.is_family_main(a));
        assert_eq!(tree.children_of(a).count(), 0);
    }

    #[test]
    fn test_picks_largest_tree() {
        let mut people = People::new();
        let loner = people.add("Loner", "", Gender::Male);
        let root = people.add("Root", "", Gender::Male);
        let kid1 = people.add("Kid1", "", Gender::Male);
        let kid2 = people.add("Kid2", "", Gender::Female);
        people.set_father(kid1, root);
        people.set_father(kid2, root);

        let tree = FamilyTree::from_people(people).unwrap();
        assert_eq!(tree.root(), root);
        // root's family + one childless family per kid
        assert_eq!(tree.size(), 3);
        assert!(!tree.contains(loner));
        assert_eq!(tree.members(), &[root, kid1, kid2]);
    }

    #[test]
    fn test_couple_family_and_unattributed_children() {
        let mut people = People::new();
        let dad = people.add("Erik", "", Gender::Male);
        let mom = people.add("Anna", "", Gender::Female);
        let shared = people.add("Lisa", "", Gender::Female);
        let own = people.add("Olle", "", Gender::Male);
        people.add_partner(dad, mom);
        people.set_father(shared, dad);
        people.set_mother(shared, mom);
        people.set_father(own, dad);

        let tree = FamilyTree::from_people(people).unwrap();
        assert_eq!(tree.root(), dad);

        let fams: Vec<&Family> = tree.families(dad).collect();
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].alt, Some(mom));
        assert_eq!(fams[0].children, vec![shared]);
        assert_eq!(fams[1].alt, None);
        assert_eq!(fams[1].children, vec![own]);

        // The partner is indexed as alt only
        assert_eq!(tree.families(mom).count(), 1);
        assert!(tree.is_family_main(dad));
        assert!(!tree.is_family_main(mom));

        // Children remember the family they came from
        let lisa_family = tree.main_families(shared).next().unwrap();
        assert_eq!(lisa_family.parent_family, Some(fams[0].fid));
        assert_eq!(tree.members(), &[dad, mom, shared, own]);
        assert_eq!(tree.children_of(dad).collect::<Vec<_>>(), vec![shared, own]);
    }

    #[test]
    fn test_two_partners_split_children() {
        let mut people = People::new();
        let p = people.add("P", "", Gender::Male);
        let a = people.add("A", "", Gender::Female);
        let b = people.add("B", "", Gender::Female);
        let c1 = people.add("C1", "", Gender::Male);
        let c2 = people.add("C2", "", Gender::Male);
        let c3 = people.add("C3", "", Gender::Male);
        people.add_partner(p, a);
        people.add_partner(p, b);
        for (c, m) in [(c1, a), (c2, a), (c3, b)] {
            people.set_father(c, p);
            people.set_mother(c, m);
        }

        let tree = FamilyTree::from_people(people).unwrap();
        let fams: Vec<&Family> = tree.main_families(p).collect();
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].children, vec![c1, c2]);
        assert_eq!(fams[1].children, vec![c3]);
        // 2 couple families + 3 childless families for the kids
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn test_partner_met_before_parent_still_expands() {
        // A meets C as a partner before C's own parent B is dequeued.
        let mut people = People::new();
        let r = people.add("R", "", Gender::Male);
        let a = people.add("A", "", Gender::Male);
        let b = people.add("B", "", Gender::Female);
        let c = people.add("C", "", Gender::Female);
        let d = people.add("D", "", Gender::Male);
        people.set_father(a, r);
        people.set_father(b, r);
        people.set_mother(c, b);
        people.add_partner(a, c);
        people.add_partner(c, d);

        let tree = FamilyTree::from_people(people).unwrap();
        assert_eq!(tree.root(), r);
        assert!(tree.contains(d));
        assert_eq!(tree.members(), &[r, a, c, b, d]);

        let c_heads: Vec<&Family> = tree.main_families(c).collect();
        assert_eq!(c_heads.len(), 1);
        assert_eq!(c_heads[0].alt, Some(d));
        // The A-C couple is not duplicated from C's side
        assert_eq!(tree.families(c).count(), 2);
        assert_eq!(tree.children_of(b).collect::<Vec<_>>(), vec![c]);
    }
}
