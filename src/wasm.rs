//! WASM bindings for the suntree-core library.
//!
//! Everything JavaScript sees goes through [`SunLayoutHandle`]. Failures are
//! reported with `console.error` and a `false` / `"null"` return instead of
//! a thrown exception.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::to_string;
use wasm_bindgen::prelude::*;

use crate::family::{FamilyTree, People, PersonRecord, RecordError};
use crate::layout::{BackgroundImage, ListenerId, SunLayout, SunLayoutConfig};
use crate::output::LayoutOutput;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

/// Why a people payload could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    Json(serde_json::Error),
    Records(RecordError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Json(e) => write!(f, "invalid people JSON: {}", e),
            LoadError::Records(e) => write!(f, "invalid people records: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Json(e) => Some(e),
            LoadError::Records(e) => Some(e),
        }
    }
}

/// Parse a JSON array of person records into a tree.
///
/// People without any name are dropped first. `Ok(None)` means nobody was
/// left to build a tree from.
pub fn parse_people(json: &str) -> Result<Option<FamilyTree>, LoadError> {
    let records: Vec<PersonRecord> = serde_json::from_str(json).map_err(LoadError::Json)?;
    let people = People::from_records(&records).map_err(LoadError::Records)?;
    Ok(FamilyTree::from_people(people.prune_empty()))
}

type SharedTree = Rc<RefCell<Option<Rc<FamilyTree>>>>;

fn layout_output_json(layout: &crate::layout::Layout, tree: Option<&FamilyTree>) -> Option<String> {
    match to_string(&LayoutOutput::new(layout, tree)) {
        Ok(json) => Some(json),
        Err(e) => {
            console_error(&format!("Error serializing layout: {}", e));
            None
        }
    }
}

#[wasm_bindgen]
pub struct SunLayoutHandle {
    engine: SunLayout,
    tree: SharedTree,
    listeners: Vec<Option<ListenerId>>,
}

impl Default for SunLayoutHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl SunLayoutHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SunLayoutHandle {
        SunLayoutHandle {
            engine: SunLayout::new(),
            tree: Rc::new(RefCell::new(None)),
            listeners: Vec::new(),
        }
    }

    /// Replace the tree with the people in `json`. Returns false (and keeps
    /// the previous tree) when the payload is invalid.
    pub fn load_people(&mut self, json: &str) -> bool {
        let tree = match parse_people(json) {
            Ok(tree) => tree.map(Rc::new),
            Err(e) => {
                console_error(&format!("Error loading people: {}", e));
                return false;
            }
        };
        if tree.is_none() {
            console_log("No people to lay out");
        }
        *self.tree.borrow_mut() = tree.clone();
        self.engine.set_family_tree(tree);
        true
    }

    /// Apply a (possibly partial) `SunLayoutConfig` JSON object.
    pub fn apply_config(&mut self, json: &str) -> bool {
        match serde_json::from_str::<SunLayoutConfig>(json) {
            Ok(config) => {
                self.engine.apply_config(&config);
                true
            }
            Err(e) => {
                console_error(&format!("Error parsing layout config: {}", e));
                false
            }
        }
    }

    pub fn config_json(&self) -> String {
        to_string(self.engine.config()).unwrap_or_else(|e| {
            console_error(&format!("Error serializing layout config: {}", e));
            "null".to_string()
        })
    }

    pub fn person_radius(&self) -> f64 {
        self.engine.person_radius()
    }

    pub fn set_person_radius(&mut self, radius: f64) {
        self.engine.set_person_radius(radius);
    }

    pub fn size(&self) -> f64 {
        self.engine.size()
    }

    pub fn set_size(&mut self, size: f64) {
        self.engine.set_size(size);
    }

    pub fn overlap(&self) -> f64 {
        self.engine.overlap()
    }

    pub fn set_overlap(&mut self, overlap: f64) {
        self.engine.set_overlap(overlap);
    }

    pub fn initial_rotation(&self) -> f64 {
        self.engine.initial_rotation()
    }

    pub fn set_initial_rotation(&mut self, rotation: f64) {
        self.engine.set_initial_rotation(rotation);
    }

    pub fn parent_ratio(&self) -> f64 {
        self.engine.parent_ratio()
    }

    pub fn set_parent_ratio(&mut self, ratio: f64) {
        self.engine.set_parent_ratio(ratio);
    }

    pub fn level_size_offset(&self, level: usize) -> f64 {
        self.engine.level_size_offset(level)
    }

    pub fn set_level_size_offset(&mut self, level: usize, offset: f64) {
        self.engine.set_level_size_offset(level, offset);
    }

    /// Pass no `src` to clear the image.
    pub fn set_background_image(&mut self, src: Option<String>, width: f64, height: f64) {
        let image = src.map(|src| BackgroundImage { src, width, height });
        self.engine.set_background_image(image);
    }

    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    /// Current layout as `LayoutOutput` JSON, recomputed if needed.
    pub fn layout_json(&mut self) -> String {
        let layout = self.engine.layout();
        let tree = self.tree.borrow();
        layout_output_json(&layout, tree.as_deref()).unwrap_or_else(|| "null".to_string())
    }

    pub fn bounding_box_json(&mut self) -> String {
        let layout = self.engine.layout();
        to_string(&layout.bounding_box()).unwrap_or_else(|e| {
            console_error(&format!("Error serializing bounding box: {}", e));
            "null".to_string()
        })
    }

    /// Call `callback` with the fresh `LayoutOutput` JSON after every
    /// recomputation. Returns a handle for `remove_listener`.
    pub fn on_layout_recalculated(&mut self, callback: js_sys::Function) -> usize {
        let tree = Rc::clone(&self.tree);
        let id = self.engine.on_layout_recalculated(move |layout| {
            let tree = tree.borrow();
            let Some(json) = layout_output_json(layout, tree.as_deref()) else {
                return;
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                console_error(&format!("Layout listener threw: {:?}", e));
            }
        });
        self.listeners.push(Some(id));
        self.listeners.len() - 1
    }

    pub fn remove_listener(&mut self, handle: usize) -> bool {
        match self.listeners.get_mut(handle).and_then(Option::take) {
            Some(id) => self.engine.remove_listener(id),
            None => false,
        }
    }
}
