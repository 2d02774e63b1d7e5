//! What the engine expects from a drawing surface, and the camera math that
//! keeps a fresh layout in view.
//!
//! Nothing here draws. A front-end implements [`Renderer`] for its canvas or
//! SVG backend and hooks [`ViewFit::follow`] up to the engine so every
//! recalculated layout is re-centered.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::family::Gender;
use crate::geometry::{Rect, Vec2};
use crate::layout::{Layout, ListenerId, SunLayout};

/// Fraction of the viewport a fitted layout occupies.
pub const FIT_MARGIN: f64 = 0.9;
pub const ZOOM_STEP: f64 = 0.06;
pub const MAX_SCALE: f64 = 1.5;

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub trait Renderer {
    /// Backend handle for a person marker (DOM element, sprite, ...).
    type Icon;

    fn set_size(&mut self, size: Size);
    fn size(&self) -> Size;
    fn set_scale(&mut self, scale: f64);
    fn scale(&self) -> f64;
    fn set_offset(&mut self, offset: Vec2);
    fn offset(&self) -> Vec2;
    fn render(&mut self, layout: &Layout);
    fn create_person_icon(&mut self, size: f64, gender: Gender, is_child: bool, is_deceased: bool) -> Self::Icon;
}

/// Scale and offset that fit a layout's bounding box into a viewport.
///
/// `scale` doubles as the minimum zoom: the user may zoom in up to
/// [`MAX_SCALE`] but never out past the fitted view.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ViewFit {
    pub scale: f64,
    pub offset: Vec2,
}

impl ViewFit {
    pub fn for_layout(bounding_box: Rect, viewport: Size) -> ViewFit {
        let scale = if bounding_box.width == 0.0 || bounding_box.height == 0.0 {
            1.0
        } else {
            (viewport.width / bounding_box.width).min(viewport.height / bounding_box.height) * FIT_MARGIN
        };
        let offset = Vec2::ZERO - bounding_box.center().scale(scale);
        ViewFit { scale, offset }
    }

    /// Fit `layout` into the renderer's viewport and apply the result.
    pub fn center_on<R: Renderer + ?Sized>(renderer: &mut R, layout: &Layout) -> ViewFit {
        let fit = ViewFit::for_layout(layout.bounding_box(), renderer.size());
        renderer.set_scale(fit.scale);
        renderer.set_offset(fit.offset);
        fit
    }

    /// Re-center `renderer` after every recalculation of `engine`.
    pub fn follow<R: Renderer + 'static>(engine: &mut SunLayout, renderer: Rc<RefCell<R>>) -> ListenerId {
        engine.on_layout_recalculated(move |layout| {
            let mut renderer = renderer.borrow_mut();
            ViewFit::center_on(&mut *renderer, layout);
        })
    }

    /// Next scale for a wheel step. `delta` is clamped to [-1, 1].
    pub fn zoom(&self, current: f64, delta: f64) -> f64 {
        let delta = delta.clamp(-1.0, 1.0);
        (current + ZOOM_STEP * delta).max(self.scale).min(MAX_SCALE)
    }
}

/// Offset while dragging: where the drag started plus how far the pointer moved.
pub fn drag_offset(start_offset: Vec2, pointer_down: Vec2, pointer_now: Vec2) -> Vec2 {
    start_offset + (pointer_now - pointer_down)
}
