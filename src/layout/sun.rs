// Sun layout engine.
//
// Every family main is a node of the layout tree; its children are the
// children of its main families in index order. Partners (alts) travel with
// their main as one unit and are split around the main's angle at the end.
//
// Rotation assignment, in order:
// 1. enumerate leaves depth-first, siblings by ascending subtree size
// 2. required width per node = 3 * person_radius per person, as an angle on
//    the node's ring
// 3. per-leaf deficit: the largest share any ancestor still lacks after
//    summing its leaves' widths
// 4. leaves consume width + deficit + an equal share of what is left of
//    2*PI + overlap, starting at initial_rotation
// 5. internal nodes interpolate between their children with parent_ratio
// 6. couples are split around their center angle
// 7. root is pinned to initial_rotation
//
// Radius is a function of depth only (uniform step + per-level offsets).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::PI;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::family::{FamilyTree, Gender, Person, PersonId};
use crate::geometry::{approx_eq, lerp, segment_length_to_rad, Vec2, EPS};

use super::scaffolding::Scaffolding;
use super::{BackgroundImage, Layout, SunLayoutConfig};

/// Straight-line space per person, in person radii.
const PERSON_SPACING: f64 = 3.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&Layout)>;

pub struct SunLayout {
    family_tree: Option<Rc<FamilyTree>>,
    config: SunLayoutConfig,
    background_image: Option<BackgroundImage>,
    metrics: TreeMetrics,
    is_dirty: bool,
    last_layout: Rc<Layout>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: usize,
}

impl Default for SunLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SunLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SunLayout")
            .field("config", &self.config)
            .field("has_tree", &self.family_tree.is_some())
            .field("is_dirty", &self.is_dirty)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SunLayout {
    pub fn new() -> Self {
        Self::with_config(SunLayoutConfig::default())
    }

    pub fn with_config(config: SunLayoutConfig) -> Self {
        Self {
            family_tree: None,
            config,
            background_image: None,
            metrics: TreeMetrics::default(),
            is_dirty: false,
            last_layout: Rc::new(Layout::empty()),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn config(&self) -> &SunLayoutConfig {
        &self.config
    }

    /// Route every field of `config` through its setter.
    pub fn apply_config(&mut self, config: &SunLayoutConfig) {
        self.set_person_radius(config.person_radius);
        self.set_size(config.size);
        self.set_overlap(config.overlap);
        self.set_initial_rotation(config.initial_rotation);
        self.set_parent_ratio(config.parent_ratio);

        let levels: Vec<usize> = self
            .config
            .level_size_offsets
            .keys()
            .chain(config.level_size_offsets.keys())
            .copied()
            .collect();
        for level in levels {
            let offset = config.level_size_offsets.get(&level).copied().unwrap_or(0.0);
            self.set_level_size_offset(level, offset);
        }
    }

    pub fn family_tree(&self) -> Option<&Rc<FamilyTree>> {
        self.family_tree.as_ref()
    }

    pub fn set_family_tree(&mut self, family_tree: Option<Rc<FamilyTree>>) {
        self.is_dirty = true;
        self.metrics = match &family_tree {
            Some(tree) => TreeMetrics::compute(tree),
            None => TreeMetrics::default(),
        };
        self.family_tree = family_tree;
    }

    pub fn person_radius(&self) -> f64 {
        self.config.person_radius
    }

    pub fn set_person_radius(&mut self, radius: f64) {
        Self::update(&mut self.config.person_radius, radius, &mut self.is_dirty);
    }

    pub fn size(&self) -> f64 {
        self.config.size
    }

    pub fn set_size(&mut self, size: f64) {
        Self::update(&mut self.config.size, size, &mut self.is_dirty);
    }

    pub fn overlap(&self) -> f64 {
        self.config.overlap
    }

    pub fn set_overlap(&mut self, overlap: f64) {
        Self::update(&mut self.config.overlap, overlap, &mut self.is_dirty);
    }

    pub fn initial_rotation(&self) -> f64 {
        self.config.initial_rotation
    }

    pub fn set_initial_rotation(&mut self, rotation: f64) {
        Self::update(&mut self.config.initial_rotation, rotation, &mut self.is_dirty);
    }

    pub fn parent_ratio(&self) -> f64 {
        self.config.parent_ratio
    }

    pub fn set_parent_ratio(&mut self, ratio: f64) {
        Self::update(&mut self.config.parent_ratio, ratio, &mut self.is_dirty);
    }

    pub fn level_size_offset(&self, level: usize) -> f64 {
        self.config.level_size_offsets.get(&level).copied().unwrap_or(0.0)
    }

    /// A zero offset removes the level from the map.
    pub fn set_level_size_offset(&mut self, level: usize, offset: f64) {
        if approx_eq(self.level_size_offset(level), offset) {
            return;
        }
        if approx_eq(offset, 0.0) {
            self.config.level_size_offsets.remove(&level);
        } else {
            self.config.level_size_offsets.insert(level, offset);
        }
        self.is_dirty = true;
    }

    pub fn background_image(&self) -> Option<&BackgroundImage> {
        self.background_image.as_ref()
    }

    pub fn set_background_image(&mut self, image: Option<BackgroundImage>) {
        self.background_image = image;
        self.is_dirty = true;
    }

    /// Register a callback fired at the end of every recomputation.
    pub fn on_layout_recalculated(&mut self, listener: impl FnMut(&Layout) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Current snapshot, recomputed first if any input changed.
    pub fn layout(&mut self) -> Rc<Layout> {
        if !self.is_dirty {
            return Rc::clone(&self.last_layout);
        }
        self.is_dirty = false;

        let layout = match &self.family_tree {
            Some(tree) => self.compute_layout(tree),
            None => Layout::empty(),
        };
        debug!(
            people = layout.positions.len(),
            shapes = layout.scaffolding.len(),
            "layout recalculated"
        );
        self.last_layout = Rc::new(layout);

        for (_, listener) in &mut self.listeners {
            listener(self.last_layout.as_ref());
        }
        Rc::clone(&self.last_layout)
    }

    fn update(slot: &mut f64, value: f64, is_dirty: &mut bool) {
        if approx_eq(*slot, value) {
            return;
        }
        *slot = value;
        *is_dirty = true;
    }

    fn rings(&self) -> Rings<'_> {
        Rings::new(&self.config, self.metrics.tree_depth)
    }

    fn compute_layout(&self, tree: &FamilyTree) -> Layout {
        let rings = self.rings();
        let plan = RotationPlan::compute(tree, &self.metrics, &self.config, &rings);
        let root = tree.root();
        let person_radius = self.config.person_radius;

        let mut positions: HashMap<PersonId, Vec2> = HashMap::with_capacity(plan.rotations.len());
        for &pid in tree.members() {
            let Some(&rotation) = plan.rotations.get(&pid) else {
                continue;
            };
            let position = if pid == root {
                Vec2::ZERO
            } else if let Some(&depth) = self.metrics.depth.get(&pid) {
                Vec2::from_radial(rings.radius(depth), rotation)
            } else {
                match plan.partner_of.get(&pid) {
                    Some(main) if *main == root => {
                        Vec2::from_radial(PERSON_SPACING * person_radius, rotation)
                    }
                    Some(main) => {
                        let depth = self.metrics.depth.get(main).copied().unwrap_or(0);
                        Vec2::from_radial(rings.radius(depth), rotation)
                    }
                    None => continue,
                }
            };
            positions.insert(pid, position);
        }

        let scaffolding = Scaffolding {
            tree,
            depth: &self.metrics.depth,
            rotations: &plan.rotations,
            positions: &positions,
            rings: &rings,
            person_radius,
        }
        .build();

        Layout::new(
            root,
            positions,
            plan.rotations,
            scaffolding,
            self.background_image.clone(),
            person_radius,
        )
    }
}

/// Depth and subtree measurements of the layout tree, rebuilt per tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct TreeMetrics {
    /// Depth of every node (family mains only; partners share their main's).
    pub depth: HashMap<PersonId, usize>,
    pub subtree_size: HashMap<PersonId, usize>,
    /// Levels in the subtree, counting the node itself.
    pub subtree_depth: HashMap<PersonId, usize>,
    /// Levels in the whole tree. At least 1 once a tree is set.
    pub tree_depth: usize,
}

impl TreeMetrics {
    pub fn compute(tree: &FamilyTree) -> Self {
        let mut metrics = TreeMetrics::default();
        metrics.dfs(tree, tree.root(), 0);
        metrics.tree_depth = metrics.subtree_depth.get(&tree.root()).copied().unwrap_or(1);
        trace!(nodes = metrics.depth.len(), depth = metrics.tree_depth, "tree metrics");
        metrics
    }

    fn dfs(&mut self, tree: &FamilyTree, node: PersonId, depth: usize) {
        let mut size = 1;
        let mut levels = 1;
        for child in tree.children_of(node) {
            self.dfs(tree, child, depth + 1);
            size += self.subtree_size(child);
            levels = levels.max(1 + self.subtree_depth.get(&child).copied().unwrap_or(1));
        }
        self.depth.insert(node, depth);
        self.subtree_size.insert(node, size);
        self.subtree_depth.insert(node, levels);
    }

    pub fn subtree_size(&self, pid: PersonId) -> usize {
        self.subtree_size.get(&pid).copied().unwrap_or(1)
    }
}

/// Ring radius per generation level.
pub(crate) struct Rings<'a> {
    step: f64,
    offsets: &'a BTreeMap<usize, f64>,
}

impl<'a> Rings<'a> {
    pub fn new(config: &'a SunLayoutConfig, tree_depth: usize) -> Self {
        let levels = tree_depth.max(1) as f64;
        Self {
            step: (config.size - config.person_radius) / 2.0 / levels,
            offsets: &config.level_size_offsets,
        }
    }

    /// Uniform step plus every configured offset for levels `1..=level`.
    pub fn radius(&self, level: usize) -> f64 {
        if level == 0 {
            return 0.0;
        }
        let extra: f64 = self.offsets.range(1..=level).map(|(_, offset)| offset).sum();
        level as f64 * self.step + extra
    }
}

/// Angles for one layout pass.
#[derive(Debug, Default)]
pub(crate) struct RotationPlan {
    /// Leaves in angular order.
    pub leaves: Vec<PersonId>,
    /// Angular budget consumed by each leaf, parallel to `leaves`.
    pub consumed: Vec<f64>,
    /// Center angle of every node before couples are split.
    pub centers: HashMap<PersonId, f64>,
    /// Final angle of every member.
    pub rotations: HashMap<PersonId, f64>,
    /// Partner -> the main it was placed with.
    pub partner_of: HashMap<PersonId, PersonId>,
}

impl RotationPlan {
    pub fn compute(
        tree: &FamilyTree,
        metrics: &TreeMetrics,
        config: &SunLayoutConfig,
        rings: &Rings<'_>,
    ) -> Self {
        let placer = Placer { tree, metrics, config, rings };
        let mut plan = RotationPlan::default();

        placer.collect_leaves(tree.root(), &mut plan.leaves);

        let mut deficits: HashMap<PersonId, f64> = HashMap::new();
        let mut per_leaf: HashMap<PersonId, f64> = HashMap::new();
        placer.measure_deficits(tree.root(), &mut per_leaf);
        placer.spread_deficits(tree.root(), 0.0, &per_leaf, &mut deficits);

        let total = 2.0 * PI + config.overlap;
        let required: f64 = plan
            .leaves
            .iter()
            .map(|&leaf| placer.required_width(leaf) + deficits.get(&leaf).copied().unwrap_or(0.0))
            .sum();
        let free_share = (total - required) / plan.leaves.len().max(1) as f64;
        trace!(total, required, free_share, leaves = plan.leaves.len(), "leaf budget");

        let mut cursor = config.initial_rotation;
        for &leaf in &plan.leaves {
            plan.centers.insert(leaf, cursor);
            let deficit = deficits.get(&leaf).copied().unwrap_or(0.0);
            let consumed = placer.required_width(leaf) + deficit + free_share;
            plan.consumed.push(consumed);
            cursor += consumed;
        }

        placer.place_internal(tree.root(), &mut plan.centers);
        plan.centers.insert(tree.root(), config.initial_rotation);

        placer.split_couples(&mut plan);
        plan
    }
}

struct Placer<'a> {
    tree: &'a FamilyTree,
    metrics: &'a TreeMetrics,
    config: &'a SunLayoutConfig,
    rings: &'a Rings<'a>,
}

impl Placer<'_> {
    fn depth(&self, pid: PersonId) -> usize {
        self.metrics.depth.get(&pid).copied().unwrap_or(0)
    }

    /// Angle a node (with its partners) needs on its own ring.
    fn required_width(&self, pid: PersonId) -> f64 {
        let people = 1 + self.tree.person(pid).partners.len();
        let length = people as f64 * self.config.person_radius * PERSON_SPACING;
        segment_length_to_rad(self.rings.radius(self.depth(pid)), length)
    }

    fn collect_leaves(&self, node: PersonId, leaves: &mut Vec<PersonId>) {
        let mut has_children = false;
        for family in self.tree.main_families(node) {
            let mut children = family.children.clone();
            children.sort_by_key(|&c| self.metrics.subtree_size(c));
            for child in children {
                has_children = true;
                self.collect_leaves(child, leaves);
            }
        }
        if !has_children {
            leaves.push(node);
        }
    }

    /// Returns (sum of leaf widths, leaf count) and records, per node, the
    /// width each of its leaves must additionally give up for the node.
    fn measure_deficits(&self, node: PersonId, per_leaf: &mut HashMap<PersonId, f64>) -> (f64, usize) {
        let mut sum = 0.0;
        let mut count = 0;
        for child in self.tree.children_of(node) {
            let (s, c) = self.measure_deficits(child, per_leaf);
            sum += s;
            count += c;
        }
        let width = self.required_width(node);
        if count == 0 {
            per_leaf.insert(node, 0.0);
            return (width, 1);
        }
        let lacking = (width - sum).max(0.0);
        per_leaf.insert(node, lacking / count as f64);
        (sum, count)
    }

    fn spread_deficits(
        &self,
        node: PersonId,
        inherited: f64,
        per_leaf: &HashMap<PersonId, f64>,
        deficits: &mut HashMap<PersonId, f64>,
    ) {
        let own = per_leaf.get(&node).copied().unwrap_or(0.0);
        let deficit = inherited.max(own);
        let mut has_children = false;
        for child in self.tree.children_of(node) {
            has_children = true;
            self.spread_deficits(child, deficit, per_leaf, deficits);
        }
        if !has_children {
            deficits.insert(node, deficit);
        }
    }

    /// Bottom-up: a node's center follows from its children's centers.
    fn place_internal(&self, node: PersonId, centers: &mut HashMap<PersonId, f64>) -> f64 {
        if let Some(&angle) = centers.get(&node) {
            return angle;
        }

        // (min, max) of children centers, one entry per family with children.
        let mut spans: Vec<(f64, f64)> = Vec::new();
        for family in self.tree.main_families(node) {
            if family.children.is_empty() {
                continue;
            }
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &child in &family.children {
                let angle = self.place_internal(child, centers);
                lo = lo.min(angle);
                hi = hi.max(angle);
            }
            spans.push((lo, hi));
        }

        let ratio = self.config.parent_ratio;
        let angle = match spans.as_slice() {
            [] => self.config.initial_rotation,
            [(lo, hi)] => lerp(*lo, *hi, ratio),
            _ => {
                // Sit between the lower and the upper half of the families.
                let split = spans.len().div_ceil(2);
                let lo = spans[..split].iter().map(|s| s.1).fold(f64::NEG_INFINITY, f64::max);
                let hi = spans[split..].iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
                lerp(lo, hi, ratio)
            }
        };
        centers.insert(node, angle);
        angle
    }

    /// Turn node centers into per-person rotations, placing partners.
    fn split_couples(&self, plan: &mut RotationPlan) {
        let root = self.tree.root();
        plan.rotations = plan.centers.clone();

        for &node in self.tree.members() {
            let Some(&center) = plan.centers.get(&node) else {
                continue;
            };
            let mut partners: Vec<PersonId> = Vec::new();
            let mut seen: HashSet<PersonId> = HashSet::new();
            for family in self.tree.main_families(node) {
                if let Some(alt) = family.alt
                    && !plan.centers.contains_key(&alt)
                    && !plan.partner_of.contains_key(&alt)
                    && seen.insert(alt)
                {
                    partners.push(alt);
                }
            }
            if partners.is_empty() {
                continue;
            }
            for &partner in &partners {
                plan.partner_of.insert(partner, node);
            }

            let k = partners.len();
            if node == root {
                // No ring to split on: spread partners around the root.
                for (i, &partner) in partners.iter().enumerate() {
                    let angle = center + 2.0 * PI * (i + 1) as f64 / (k + 1) as f64;
                    plan.rotations.insert(partner, angle);
                }
                continue;
            }

            let width = self.required_width(node);
            if k == 1 {
                let lower = center - width / 4.0;
                let upper = center + width / 4.0;
                let main_lower = main_takes_lower(
                    self.tree.person(node),
                    self.tree.person(partners[0]),
                    lower,
                    upper,
                );
                let (main_angle, partner_angle) = if main_lower { (lower, upper) } else { (upper, lower) };
                plan.rotations.insert(node, main_angle);
                plan.rotations.insert(partners[0], partner_angle);
                continue;
            }

            // lower partners, main, upper partners
            let split = k.div_ceil(2);
            let mut order: Vec<PersonId> = partners[..split].to_vec();
            order.push(node);
            order.extend_from_slice(&partners[split..]);
            let m = order.len() as f64;
            for (i, &pid) in order.iter().enumerate() {
                let angle = center + (i as f64 - (m - 1.0) / 2.0) * width / m;
                plan.rotations.insert(pid, angle);
            }
        }
    }
}

/// Visual ordering policy for a couple: the man sits screen-left of the
/// woman (smaller x); when both share an x, the man sits above (smaller y).
/// Without a gender difference the main keeps the lower angle.
fn main_takes_lower(main: &Person, partner: &Person, lower: f64, upper: f64) -> bool {
    fn rank(gender: Gender) -> u8 {
        match gender {
            Gender::Male => 0,
            Gender::Other => 1,
            Gender::Female => 2,
        }
    }
    if rank(main.gender) == rank(partner.gender) {
        return true;
    }
    let main_goes_left = rank(main.gender) < rank(partner.gender);

    let (cos_lower, cos_upper) = (lower.cos(), upper.cos());
    let lower_is_left = if (cos_lower - cos_upper).abs() < EPS {
        lower.sin() < upper.sin()
    } else {
        cos_lower < cos_upper
    };
    main_goes_left == lower_is_left
}
