// Scaffolding: connector shapes for a finished placement.
//
// Per family headed by a node:
// - couple arc on the family ring between main and partner (a line at the
//   root, which has no ring, or between partners on different rings)
// - single child of a single-family node: one straight line
// - otherwise a curvy join: an arc just inside the child ring, bezier tips
//   bending out to the extreme children, a level-join line down from the
//   family midpoint, and one line per child
//
// Shapes are emitted in member order, families in creation order.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::family::{Family, FamilyTree, PersonId};
use crate::geometry::{approx_eq, normalize_angle, segment_length_to_rad, Shape, Vec2};

use super::sun::Rings;

pub(crate) struct Scaffolding<'a> {
    pub tree: &'a FamilyTree,
    pub depth: &'a HashMap<PersonId, usize>,
    pub rotations: &'a HashMap<PersonId, f64>,
    pub positions: &'a HashMap<PersonId, Vec2>,
    pub rings: &'a Rings<'a>,
    pub person_radius: f64,
}

impl Scaffolding<'_> {
    pub fn build(&self) -> Vec<Shape> {
        let mut shapes = Vec::new();
        for &pid in self.tree.members() {
            let Some(&depth) = self.depth.get(&pid) else {
                continue;
            };
            let Some(&angle) = self.rotations.get(&pid) else {
                continue;
            };
            // Heading at least one family is enough; the first indexed one
            // may list `pid` as a partner.
            let families: Vec<&Family> = self.tree.main_families(pid).collect();
            if families.is_empty() {
                continue;
            }
            let single_family = families.len() == 1;
            for family in families {
                self.family(family, depth, angle, single_family, &mut shapes);
            }
        }
        shapes
    }

    fn family(&self, family: &Family, depth: usize, main_angle: f64, single_family: bool, out: &mut Vec<Shape>) {
        let r = self.rings.radius(depth);

        let mut mid = main_angle;
        if let Some(alt) = family.alt
            && let Some(&alt_angle) = self.rotations.get(&alt)
        {
            let mut alt_angle = alt_angle;
            match self.depth.get(&alt) {
                // Both partners placed on their own: take the short way round.
                Some(&alt_depth) if alt_depth == depth && depth > 0 => {
                    alt_angle = main_angle + short_turn(main_angle, alt_angle);
                    out.push(Shape::arc(Vec2::ZERO, r, main_angle.min(alt_angle), main_angle.max(alt_angle)));
                }
                Some(_) => self.couple_line(family.main, alt, out),
                None if depth == 0 => self.couple_line(family.main, alt, out),
                None => {
                    out.push(Shape::arc(Vec2::ZERO, r, main_angle.min(alt_angle), main_angle.max(alt_angle)));
                }
            }
            mid = (main_angle + alt_angle) / 2.0;
        }

        let children: Vec<(f64, Vec2)> = family
            .children
            .iter()
            .filter_map(|c| Some((*self.rotations.get(c)?, *self.positions.get(c)?)))
            .collect();
        if children.is_empty() {
            return;
        }

        if children.len() == 1 && single_family {
            out.push(Shape::line(Vec2::from_radial(r, mid), children[0].1));
            return;
        }

        let lo = children.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let hi = children.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let pr = self.person_radius;
        let inset = self.rings.radius(depth + 1) - 2.0 * pr;

        let tip = segment_length_to_rad(inset, pr).min((hi - lo) / 2.0);
        let tip1 = if mid < lo { -1.0 } else { 1.0 };
        let tip2 = if mid > hi { -1.0 } else { 1.0 };
        let start = lo + tip1 * tip;
        let end = hi - tip2 * tip;

        out.push(Shape::arc(Vec2::ZERO, inset, start.min(mid), end.max(mid)));
        out.push(Shape::bezier(
            Vec2::from_radial(inset, start),
            Vec2::from_radial(inset + pr, lo),
            Vec2::from_radial(inset, lo),
        ));
        if !approx_eq(lo, hi) {
            out.push(Shape::bezier(
                Vec2::from_radial(inset, end),
                Vec2::from_radial(inset + pr, hi),
                Vec2::from_radial(inset, hi),
            ));
        }
        out.push(Shape::line(Vec2::from_radial(r, mid), Vec2::from_radial(inset, mid)));

        for (angle, position) in children {
            let extreme = approx_eq(angle, lo) || approx_eq(angle, hi);
            let from_r = if extreme { inset + pr } else { inset };
            out.push(Shape::line(Vec2::from_radial(from_r, angle), position));
        }
    }

    fn couple_line(&self, main: PersonId, alt: PersonId, out: &mut Vec<Shape>) {
        if let (Some(&from), Some(&to)) = (self.positions.get(&main), self.positions.get(&alt)) {
            out.push(Shape::line(from, to));
        }
    }
}

/// Signed turn from `from` to `to` of at most half a revolution.
fn short_turn(from: f64, to: f64) -> f64 {
    let turn = normalize_angle(to - from);
    if turn > PI { turn - 2.0 * PI } else { turn }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use std::rc::Rc;

    use crate::family::{FamilyTree, Gender, People};
    use crate::geometry::{Arc, Bezier, Shape, Vec2, approx_eq, segment_length_to_rad, EPS};
    use crate::layout::{Layout, SunLayout, SunLayoutConfig};

    fn layout_of(people: People) -> Rc<Layout> {
        layout_of_tree(FamilyTree::from_people(people).unwrap())
    }

    fn layout_of_tree(tree: FamilyTree) -> Rc<Layout> {
        let mut engine = SunLayout::with_config(SunLayoutConfig {
            person_radius: 10.0,
            size: 400.0,
            ..Default::default()
        });
        engine.set_family_tree(Some(Rc::new(tree)));
        engine.layout()
    }

    fn count(shapes: &[Shape]) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for s in shapes {
            match s {
                Shape::Line(_) => counts.0 += 1,
                Shape::Arc(_) => counts.1 += 1,
                Shape::Bezier(_) => counts.2 += 1,
            }
        }
        counts
    }

    #[test]
    fn test_single_child_is_a_straight_line() {
        let mut people = People::new();
        let root = people.add("Root", "", Gender::Male);
        let kid = people.add("Kid", "", Gender::Female);
        people.set_father(kid, root);
        let layout = layout_of(people);

        assert_eq!(layout.scaffolding.len(), 1);
        let Shape::Line(line) = layout.scaffolding[0] else {
            panic!("expected a line");
        };
        assert!(line.from.approx_eq(Vec2::ZERO));
        assert!(line.to.approx_eq(layout.positions[&kid]));
    }

    #[test]
    fn test_couple_at_root_with_three_children() {
        let mut people = People::new();
        let root = people.add("Root", "", Gender::Male);
        let wife = people.add("Wife", "", Gender::Female);
        people.add_partner(root, wife);
        let mut kids = Vec::new();
        for name in ["K1", "K2", "K3"] {
            let k = people.add(name, "", Gender::Other);
            people.set_father(k, root);
            people.set_mother(k, wife);
            kids.push(k);
        }
        let layout = layout_of(people);

        // couple line + level join + 3 child lines, one arc, two tips
        assert_eq!(count(&layout.scaffolding), (5, 1, 2));
        let Shape::Line(couple) = layout.scaffolding[0] else {
            panic!("expected the couple line first");
        };
        assert!(couple.to.approx_eq(layout.positions[&wife]));

        // Every child is reached by exactly one line ending at it
        for kid in &kids {
            let ends = layout
                .scaffolding
                .iter()
                .filter(|s| matches!(s, Shape::Line(l) if l.to.approx_eq(layout.positions[kid])))
                .count();
            assert_eq!(ends, 1);
        }
    }

    #[test]
    fn test_join_arc_spans_children() {
        let mut people = People::new();
        let root = people.add("Root", "", Gender::Male);
        let mid = people.add("Mid", "", Gender::Male);
        people.set_father(mid, root);
        let mut kids = Vec::new();
        for name in ["A", "B", "C"] {
            let k = people.add(name, "", Gender::Other);
            people.set_father(k, mid);
            kids.push(k);
        }
        let layout = layout_of(people);

        let arcs: Vec<Arc> = layout
            .scaffolding
            .iter()
            .filter_map(|s| if let Shape::Arc(a) = s { Some(*a) } else { None })
            .collect();
        assert_eq!(arcs.len(), 1);
        let arc = arcs[0];
        // depth 3 => ring 2 at 130, inset 110
        assert!(approx_eq(arc.r, 110.0));
        let angles: Vec<f64> = kids.iter().map(|k| layout.rotations[k]).collect();
        let lo = angles.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = angles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(arc.from_angle >= lo - 1e-9 && arc.to_angle <= hi + 1e-9);
        assert!(arc.from_angle <= layout.rotations[&mid] && layout.rotations[&mid] <= arc.to_angle);
    }

    #[test]
    fn test_childless_single_has_no_scaffolding() {
        let mut people = People::new();
        people.add("Only", "", Gender::Other);
        assert!(layout_of(people).scaffolding.is_empty());
    }

    fn arcs_at(layout: &Layout, r: f64) -> Vec<Arc> {
        layout
            .scaffolding
            .iter()
            .filter_map(|s| match s {
                Shape::Arc(a) if approx_eq(a.r, r) => Some(*a),
                _ => None,
            })
            .collect()
    }

    fn bezier_to(layout: &Layout, to: Vec2) -> Bezier {
        layout
            .scaffolding
            .iter()
            .find_map(|s| match s {
                Shape::Bezier(b) if b.to.approx_eq(to) => Some(*b),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_partner_heading_a_later_family_gets_its_arc() {
        // Cousins Y and X marry; X also has a partner W from outside.
        let mut people = People::new();
        let root = people.add("R", "", Gender::Male);
        let a = people.add("A", "", Gender::Male);
        let b = people.add("B", "", Gender::Male);
        people.set_father(a, root);
        people.set_father(b, root);
        let y = people.add("Y", "", Gender::Female);
        let x = people.add("X", "", Gender::Male);
        people.set_father(y, a);
        people.set_father(x, b);
        let w = people.add("W", "", Gender::Female);
        people.add_partner(y, x);
        people.add_partner(x, w);

        let tree = FamilyTree::from_people(people).unwrap();
        assert!(!tree.is_family_main(x));
        let layout = layout_of_tree(tree);

        // depth 3 => ring 2 at 130
        let arcs = arcs_at(&layout, 130.0);
        assert_eq!(arcs.len(), 2);
        let (rx, rw) = (layout.rotations[&x], layout.rotations[&w]);
        let xw = arcs
            .iter()
            .find(|arc| approx_eq(arc.from_angle, rx.min(rw)) && approx_eq(arc.to_angle, rx.max(rw)));
        assert!(xw.is_some());

        // The cousin couple takes the short way between their own places
        let yx = arcs.iter().find(|arc| !std::ptr::eq(*arc, xw.unwrap())).unwrap();
        assert!(yx.sweep() <= PI + EPS);
        let ends = [yx.from(), yx.to()];
        assert!(ends.iter().any(|p| p.approx_eq(layout.positions[&y])));
        assert!(ends.iter().any(|p| p.approx_eq(layout.positions[&x])));
    }

    #[test]
    fn test_join_reaches_a_midpoint_outside_the_children() {
        // P has two partners; each family's midpoint falls outside its
        // children's span.
        let mut people = People::new();
        let root = people.add("Root", "", Gender::Male);
        let p = people.add("P", "", Gender::Male);
        people.set_father(p, root);
        let a = people.add("A", "", Gender::Female);
        let b = people.add("B", "", Gender::Female);
        people.add_partner(p, a);
        people.add_partner(p, b);
        let mut kids = Vec::new();
        for (name, mother) in [("C1", a), ("C2", a), ("C3", b)] {
            let c = people.add(name, "", Gender::Male);
            people.set_father(c, p);
            people.set_mother(c, mother);
            kids.push(c);
        }
        let layout = layout_of(people);
        let rot = |pid| layout.rotations[&pid];

        // depth 3 => ring 2 at 130, inset 110, tips bend out to 120
        let (inset, pr) = (110.0, 10.0);
        let joins = arcs_at(&layout, inset);
        assert_eq!(joins.len(), 2);

        // First family: midpoint past the upper child
        let (lo, hi) = (rot(kids[0]).min(rot(kids[1])), rot(kids[0]).max(rot(kids[1])));
        let mid = (rot(p) + rot(a)) / 2.0;
        assert!(mid > hi);
        let tip = segment_length_to_rad(inset, pr).min((hi - lo) / 2.0);
        assert!(approx_eq(joins[0].to_angle, mid));
        assert!(approx_eq(joins[0].from_angle, lo + tip));
        let upper = bezier_to(&layout, Vec2::from_radial(inset + pr, hi));
        assert!(upper.from.approx_eq(Vec2::from_radial(inset, hi + tip)));
        assert!(upper.cp.approx_eq(Vec2::from_radial(inset, hi)));
        let lower = bezier_to(&layout, Vec2::from_radial(inset + pr, lo));
        assert!(lower.from.approx_eq(Vec2::from_radial(inset, lo + tip)));

        // Second family: midpoint before its only child
        let only = rot(kids[2]);
        let mid = (rot(p) + rot(b)) / 2.0;
        assert!(mid < only);
        assert!(approx_eq(joins[1].from_angle, mid));
        assert!(approx_eq(joins[1].to_angle, only));
        let stub = bezier_to(&layout, Vec2::from_radial(inset + pr, only));
        assert!(stub.from.approx_eq(Vec2::from_radial(inset, only)));
    }
}
