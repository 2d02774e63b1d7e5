// Sun layout: FamilyTree -> radial placement.
//
// Goals:
// - Deterministic: same tree + parameters => same layout
// - Root at the origin, one ring per generation
// - Leaves partition the full circle (plus overlap) by required width
// - Parents derive their angle from their children
// - Produces scaffolding shapes (arcs, lines, beziers) joining generations
//
// Submodules:
// - sun: the engine (parameters, dirty tracking, rotation assignment)
// - scaffolding: connector shapes for a finished placement
//
// Output:
// - Layout snapshot with positions, rotations, scaffolding + bounding box.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::family::PersonId;
use crate::geometry::{Rect, Shape, Vec2};

mod scaffolding;
mod sun;

pub use sun::{ListenerId, SunLayout};

/// Image drawn behind the diagram, centered on the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundImage {
    /// URL or data URI, handed to the renderer untouched.
    pub src: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SunLayoutConfig {
    /// Radius of a person marker, in pixels.
    pub person_radius: f64,
    /// Diameter budget of the whole diagram.
    pub size: f64,
    /// Angular budget on top of a full circle. Negative shrinks it.
    pub overlap: f64,
    /// Angle of the first leaf (and of the root).
    pub initial_rotation: f64,
    /// Where a parent sits between its children's extreme angles.
    pub parent_ratio: f64,
    /// Extra radial distance per generation level, accumulated outward.
    pub level_size_offsets: BTreeMap<usize, f64>,
}

impl Default for SunLayoutConfig {
    fn default() -> Self {
        Self {
            person_radius: 25.0,
            size: 600.0,
            overlap: 0.0,
            initial_rotation: 0.0,
            parent_ratio: 1.0 / GOLDEN_RATIO,
            level_size_offsets: BTreeMap::new(),
        }
    }
}

pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Immutable result of one layout pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    /// None only for the empty layout.
    pub root: Option<PersonId>,
    pub positions: HashMap<PersonId, Vec2>,
    pub rotations: HashMap<PersonId, f64>,
    pub scaffolding: Vec<Shape>,
    pub background_image: Option<BackgroundImage>,
    pub person_radius: f64,
    #[serde(skip)]
    bounding_box: OnceCell<Rect>,
}

impl Layout {
    pub fn new(
        root: PersonId,
        positions: HashMap<PersonId, Vec2>,
        rotations: HashMap<PersonId, f64>,
        scaffolding: Vec<Shape>,
        background_image: Option<BackgroundImage>,
        person_radius: f64,
    ) -> Self {
        Self {
            root: Some(root),
            positions,
            rotations,
            scaffolding,
            background_image,
            person_radius,
            bounding_box: OnceCell::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Box around every position, computed once per snapshot.
    pub fn bounding_box(&self) -> Rect {
        *self
            .bounding_box
            .get_or_init(|| Rect::enclosing(self.positions.values().copied()))
    }
}
