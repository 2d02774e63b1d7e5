//! Radial "sun" family-tree layout.
//!
//! A [`FamilyTree`] is built from a flat list of people; [`SunLayout`] turns it
//! into positions on concentric rings (one ring per generation) plus the
//! scaffolding shapes that join parents to children. The `wasm` module exposes
//! the engine to a JavaScript renderer.

pub mod family;
pub mod geometry;
pub mod layout;
pub mod output;
pub mod view;
pub mod wasm;

pub use family::{FamilyTree, Gender, People, Person, PersonId};
pub use layout::{Layout, SunLayout, SunLayoutConfig};
