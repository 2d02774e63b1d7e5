//! Output types for the JS renderer.
//!
//! A [`Layout`] snapshot plus the tree it was computed from, flattened into
//! plain structs and serialized to JSON for drawing.

use std::f64::consts::PI;

use serde::Serialize;

use crate::family::{FamilyTree, Gender};
use crate::geometry::{normalize_angle, Rect, Shape, Vec2};
use crate::layout::{BackgroundImage, Layout};

/// A placed person ready for drawing
#[derive(Debug, Clone, Serialize)]
pub struct PersonOutput {
    pub id: usize,
    pub name: String,
    /// Life span label, empty when unknown
    pub dates: String,
    pub gender: Gender,
    pub deceased: bool,
    /// Has a parent in the data (drawn differently from partners married in)
    pub is_child: bool,
    pub is_root: bool,
    pub position: Vec2,
    pub rotation: f64,
    /// Rotation to draw the name with, flipped to stay upright
    pub label_rotation: f64,
    /// Name goes on the inner side of the marker
    pub text_on_left: bool,
}

/// The combined output sent to the front-end
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutput {
    pub people: Vec<PersonOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scaffolding: Vec<Shape>,
    pub bounding_box: Rect,
    pub person_radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<BackgroundImage>,
}

impl LayoutOutput {
    /// People come out in tree member order. Ids in the layout that the
    /// tree does not know are skipped.
    pub fn new(layout: &Layout, tree: Option<&FamilyTree>) -> LayoutOutput {
        let mut people = Vec::new();
        if let Some(tree) = tree {
            for &pid in tree.members() {
                let (Some(&position), Some(&rotation)) = (layout.positions.get(&pid), layout.rotations.get(&pid))
                else {
                    continue;
                };
                let person = tree.person(pid);
                let (label_rotation, text_on_left) = label_rotation(rotation);
                people.push(PersonOutput {
                    id: pid.0,
                    name: person.full_name(),
                    dates: person.dates(),
                    gender: person.gender,
                    deceased: person.deceased,
                    is_child: person.has_parents(),
                    is_root: layout.root == Some(pid),
                    position,
                    rotation,
                    label_rotation,
                    text_on_left,
                });
            }
        }

        LayoutOutput {
            people,
            scaffolding: layout.scaffolding.clone(),
            bounding_box: layout.bounding_box(),
            person_radius: layout.person_radius,
            background_image: layout.background_image.clone(),
        }
    }
}

/// Labels on the left half of the circle are turned half a revolution so
/// the text never reads upside down.
pub fn label_rotation(rotation: f64) -> (f64, bool) {
    let rotation = normalize_angle(rotation);
    let on_left = rotation > PI / 2.0 && rotation < 3.0 * PI / 2.0;
    if on_left { (rotation - PI, true) } else { (rotation, false) }
}
