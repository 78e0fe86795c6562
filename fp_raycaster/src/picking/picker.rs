use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use nalgebra::{Point3, Vector2};
use parking_lot::Mutex;

use crate::{
    camera::PerspectiveCamera,
    common::{BoundBox, Ray},
};

/// Stable identity of an object that depends on a picker (a widget, a representation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Fresh identity, never returned before in this process
    pub fn new() -> ObjectId {
        ObjectId(NEXT_OBJECT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

/// Identity of a pickable prop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropId(pub u32);

/// Props from the picked leaf up to the outermost assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPath {
    props: Vec<PropId>,
}

impl AssemblyPath {
    pub fn new(props: Vec<PropId>) -> AssemblyPath {
        AssemblyPath { props }
    }

    pub fn first(&self) -> Option<PropId> {
        self.props.first().copied()
    }

    pub fn props(&self) -> &[PropId] {
        &self.props
    }
}

/// Successful geometric pick
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// World position of the hit
    pub position: Point3<f32>,
    pub path: AssemblyPath,
}

/// Renderer a pick is performed in
pub trait PickRenderer {
    /// World position of the active camera
    fn camera_position(&self) -> Point3<f32>;

    /// World ray through display position `(x, y)`, in pixels
    fn display_ray(&self, x: f32, y: f32) -> Ray;
}

/// Geometric picking capability
pub trait Picker {
    /// Pick at display position `(x, y)`, `z` is a depth hint in `<0;1>`
    fn pick(&mut self, x: f32, y: f32, z: f32, renderer: &dyn PickRenderer) -> Option<PickHit>;

    /// Result of the last pick, `None` if it missed
    fn last_hit(&self) -> Option<&PickHit>;

    fn path(&self) -> Option<AssemblyPath> {
        self.last_hit().map(|hit| hit.path.clone())
    }
}

/// Picker shared between its owner and the picking manager
pub type SharedPicker = Arc<Mutex<dyn Picker + Send>>;

/// Wrap a picker for registration
pub fn shared_picker<P: Picker + Send + 'static>(picker: P) -> SharedPicker {
    Arc::new(Mutex::new(picker))
}

/// Camera and image size, enough to turn display positions into rays
#[derive(Debug, Clone)]
pub struct Viewport {
    pub camera: PerspectiveCamera,
    pub resolution: Vector2<usize>,
}

impl Viewport {
    pub fn new(camera: PerspectiveCamera, resolution: Vector2<usize>) -> Viewport {
        Viewport { camera, resolution }
    }
}

impl PickRenderer for Viewport {
    fn camera_position(&self) -> Point3<f32> {
        self.camera.get_pos()
    }

    fn display_ray(&self, x: f32, y: f32) -> Ray {
        self.camera.get_ray((
            x / self.resolution.x as f32,
            y / self.resolution.y as f32,
        ))
    }
}

/// Prop with its world bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickableProp {
    pub id: PropId,
    pub bounds: BoundBox,
    pub pickable: bool,
}

/// Picks the closest prop whose bounding box the display ray hits
#[derive(Debug, Default)]
pub struct PropPicker {
    props: Vec<PickableProp>,
    last: Option<PickHit>,
}

impl PropPicker {
    pub fn new() -> PropPicker {
        PropPicker::default()
    }

    pub fn add_prop(&mut self, id: PropId, bounds: BoundBox) {
        self.props.push(PickableProp {
            id,
            bounds,
            pickable: true,
        });
    }

    /// Exclude a prop from picking, returns `false` if unknown
    pub fn set_pickable(&mut self, id: PropId, pickable: bool) -> bool {
        match self.props.iter_mut().find(|p| p.id == id) {
            Some(prop) => {
                prop.pickable = pickable;
                true
            }
            None => false,
        }
    }

    pub fn props(&self) -> &[PickableProp] {
        &self.props
    }
}

impl Picker for PropPicker {
    fn pick(&mut self, x: f32, y: f32, _z: f32, renderer: &dyn PickRenderer) -> Option<PickHit> {
        let ray = renderer.display_ray(x, y);

        let closest = self
            .props
            .iter()
            .filter(|p| p.pickable)
            .filter_map(|p| {
                let (t0, _) = p.bounds.intersect(&ray)?;
                Some((t0.max(0.0), p.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        self.last = closest.map(|(t, id)| PickHit {
            position: ray.point_from_t(t),
            path: AssemblyPath::new(vec![id]),
        });
        self.last.clone()
    }

    fn last_hit(&self) -> Option<&PickHit> {
        self.last.as_ref()
    }
}
