//! Brokers pick queries between competing pickers.
//!
//! Widgets register the picker they pick with, together with themselves as the
//! dependent object. On an interaction event every registered picker is asked once,
//! the one with the hit closest to the camera is selected and cached until the next
//! event. The manager never keeps pickers, objects or the interactor alive.

use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::Mutex;

use super::{
    interactor::{Interactor, SharedInteractor},
    picker::{AssemblyPath, ObjectId, PickRenderer, Picker, SharedPicker},
};

type WeakPicker = Weak<Mutex<dyn Picker + Send>>;

fn same_picker(a: &WeakPicker, b: &SharedPicker) -> bool {
    std::ptr::eq(a.as_ptr() as *const (), Arc::as_ptr(b) as *const ())
}

struct PickerEntry {
    picker: WeakPicker,
    /// `None` is the global object
    objects: Vec<Option<ObjectId>>,
}

pub struct PickingManager {
    entries: Vec<PickerEntry>,
    enabled: bool,
    optimize_on_interactor_events: bool,
    interactor: Option<Weak<Mutex<dyn Interactor + Send>>>,
    last_selected: Option<WeakPicker>,
    /// Interaction time of the cached selection
    last_picking_time: Option<u64>,
}

impl Default for PickingManager {
    fn default() -> Self {
        PickingManager {
            entries: Vec::new(),
            enabled: false,
            optimize_on_interactor_events: true,
            interactor: None,
            last_selected: None,
            last_picking_time: None,
        }
    }
}

impl PickingManager {
    pub fn new() -> PickingManager {
        PickingManager::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled managers let every picker pick on its own
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn optimize_on_interactor_events(&self) -> bool {
        self.optimize_on_interactor_events
    }

    /// Reuse the selection while the interaction time stays the same
    pub fn set_optimize_on_interactor_events(&mut self, optimize: bool) {
        self.optimize_on_interactor_events = optimize;
    }

    pub fn set_interactor(&mut self, interactor: Option<&SharedInteractor>) {
        self.interactor = interactor.map(Arc::downgrade);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.last_selected = None;
        self.last_picking_time = None;
    }

    fn entry_mut(&mut self, picker: &SharedPicker) -> Option<&mut PickerEntry> {
        self.entries
            .iter_mut()
            .find(|e| same_picker(&e.picker, picker))
    }

    fn entry(&self, picker: &SharedPicker) -> Option<&PickerEntry> {
        self.entries.iter().find(|e| same_picker(&e.picker, picker))
    }

    // Entries whose picker was dropped or whose objects are gone
    fn prune(&mut self) {
        self.entries
            .retain(|e| e.picker.strong_count() > 0 && !e.objects.is_empty());
        let cached_alive = self
            .last_selected
            .as_ref()
            .map_or(true, |cached| {
                self.entries.iter().any(|e| Weak::ptr_eq(&e.picker, cached))
            });
        if !cached_alive {
            self.invalidate();
        }
    }

    /// Register `object` as a dependent of `picker`.
    /// Registering the same pair twice has no effect.
    pub fn add_picker(&mut self, picker: &SharedPicker, object: Option<ObjectId>) {
        self.prune();
        match self.entry_mut(picker) {
            Some(entry) if entry.objects.contains(&object) => {
                debug!("Picker already registered for object {:?}", object);
            }
            Some(entry) => entry.objects.push(object),
            None => self.entries.push(PickerEntry {
                picker: Arc::downgrade(picker),
                objects: vec![object],
            }),
        }
    }

    /// Remove `object` from the dependents of `picker`, the picker goes with its last object
    pub fn remove_picker(&mut self, picker: &SharedPicker, object: Option<ObjectId>) {
        if let Some(entry) = self.entry_mut(picker) {
            entry.objects.retain(|o| *o != object);
        }
        self.prune();
    }

    /// Remove `object` from every picker
    pub fn remove_object(&mut self, object: Option<ObjectId>) {
        for entry in &mut self.entries {
            entry.objects.retain(|o| *o != object);
        }
        self.prune();
    }

    /// Registered pickers that are still alive
    pub fn number_of_pickers(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.picker.strong_count() > 0)
            .count()
    }

    /// Objects depending on `picker`, 0 for `None` and unknown pickers
    pub fn number_of_objects_linked(&self, picker: Option<&SharedPicker>) -> usize {
        picker
            .and_then(|p| self.entry(p))
            .map_or(0, |e| e.objects.len())
    }

    /// Whether `object` depends on `picker`
    pub fn is_registered(&self, picker: &SharedPicker, object: Option<ObjectId>) -> bool {
        self.entry(picker)
            .map_or(false, |e| e.objects.contains(&object))
    }

    /// Picker whose hit at the current event position is closest to the camera.
    ///
    /// `None` without an interactor or when nothing is hit. While the interaction
    /// time does not advance the previous selection is returned without picking.
    pub fn select_picker(&mut self) -> Option<SharedPicker> {
        let interactor = self.interactor.as_ref()?.upgrade()?;
        let interactor = interactor.lock();
        let time = interactor.event_time();

        if self.optimize_on_interactor_events && self.last_picking_time == Some(time) {
            return self.last_selected.as_ref().and_then(Weak::upgrade);
        }

        let (x, y) = interactor.event_position();
        let selected = interactor
            .poked_renderer(x, y)
            .and_then(|renderer| self.closest_picker(x, y, renderer));

        debug!(
            "Picker selection at ({}, {}): {}",
            x,
            y,
            if selected.is_some() { "hit" } else { "none" }
        );

        self.last_selected = selected.as_ref().map(Arc::downgrade);
        self.last_picking_time = Some(time);
        selected
    }

    // First registered picker wins ties
    fn closest_picker(&self, x: f32, y: f32, renderer: &dyn PickRenderer) -> Option<SharedPicker> {
        let camera = renderer.camera_position();
        let mut closest: Option<(f32, SharedPicker)> = None;

        for picker in self.entries.iter().filter_map(|e| e.picker.upgrade()) {
            let hit = picker.lock().pick(x, y, 0.0, renderer);
            let distance = match hit {
                Some(hit) => (hit.position - camera).norm_squared(),
                None => continue,
            };
            if closest.as_ref().map_or(true, |(best, _)| distance < *best) {
                closest = Some((distance, picker));
            }
        }

        closest.map(|(_, picker)| picker)
    }

    /// Whether the selected picker has `object` among its dependents
    pub fn pick(&mut self, object: Option<ObjectId>) -> bool {
        match self.select_picker() {
            Some(selected) => self.is_registered(&selected, object),
            None => false,
        }
    }

    /// Whether `picker` is registered for `object` and is the selected picker
    pub fn pick_with(&mut self, picker: &SharedPicker, object: Option<ObjectId>) -> bool {
        if !self.is_registered(picker, object) {
            return false;
        }
        self.select_picker()
            .map_or(false, |selected| Arc::ptr_eq(&selected, picker))
    }

    /// Path picked by `picker` at `(x, y, z)`.
    ///
    /// With the manager enabled the path is returned only when `picker` wins the
    /// selection for `object`, otherwise `picker` picks directly.
    pub fn assembly_path(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        picker: &SharedPicker,
        renderer: &dyn PickRenderer,
        object: Option<ObjectId>,
    ) -> Option<AssemblyPath> {
        if self.enabled {
            if !self.pick_with(picker, object) {
                return None;
            }
        } else {
            picker.lock().pick(x, y, z, renderer);
        }
        picker.lock().path()
    }
}

#[cfg(test)]
mod test {

    use nalgebra::{point, vector, Point3};

    use super::*;
    use crate::{
        camera::PerspectiveCamera,
        common::BoundBox,
        picking::{shared_picker, PickHit, PropId, PropPicker, Viewport, ViewportInteractor},
    };

    /// Counts geometric picks
    struct CountingPicker {
        inner: PropPicker,
        picks: Arc<Mutex<usize>>,
    }

    impl Picker for CountingPicker {
        fn pick(
            &mut self,
            x: f32,
            y: f32,
            z: f32,
            renderer: &dyn PickRenderer,
        ) -> Option<PickHit> {
            *self.picks.lock() += 1;
            self.inner.pick(x, y, z, renderer)
        }

        fn last_hit(&self) -> Option<&PickHit> {
            self.inner.last_hit()
        }
    }

    fn unit_box(center: Point3<f32>) -> BoundBox {
        BoundBox::new(center - vector![0.5, 0.5, 0.5], center + vector![0.5, 0.5, 0.5])
    }

    fn prop_picker(id: u32, center: Point3<f32>) -> SharedPicker {
        let mut picker = PropPicker::new();
        picker.add_prop(PropId(id), unit_box(center));
        shared_picker(picker)
    }

    fn interactor() -> Arc<Mutex<ViewportInteractor>> {
        let camera = PerspectiveCamera::new(point![0.0, 0.0, 10.0], vector![0.0, 0.0, -1.0]);
        let mut interactor = ViewportInteractor::new(Viewport::new(camera, vector![100, 100]));
        interactor.set_event_position(50.0, 50.0);
        Arc::new(Mutex::new(interactor))
    }

    fn attach(manager: &mut PickingManager, interactor: &Arc<Mutex<ViewportInteractor>>) {
        let shared: SharedInteractor = interactor.clone();
        manager.set_interactor(Some(&shared));
    }

    #[test]
    fn registration_scenario() {
        let mut manager = PickingManager::new();
        let picker = prop_picker(1, point![0.0, 0.0, 0.0]);
        let obj1 = Some(ObjectId::new());
        let obj2 = Some(ObjectId::new());

        manager.add_picker(&picker, obj1);
        assert_eq!(manager.number_of_pickers(), 1);
        assert_eq!(manager.number_of_objects_linked(Some(&picker)), 1);

        manager.add_picker(&picker, obj2);
        assert_eq!(manager.number_of_objects_linked(Some(&picker)), 2);

        manager.remove_object(obj1);
        assert_eq!(manager.number_of_objects_linked(Some(&picker)), 1);

        manager.remove_object(obj2);
        assert_eq!(manager.number_of_pickers(), 0);
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let mut manager = PickingManager::new();
        let picker = prop_picker(1, point![0.0, 0.0, 0.0]);
        let obj = Some(ObjectId::new());

        manager.add_picker(&picker, obj);
        manager.add_picker(&picker, obj);
        assert_eq!(manager.number_of_objects_linked(Some(&picker)), 1);
        assert_eq!(manager.number_of_objects_linked(None), 0);
    }

    #[test]
    fn removal_of_unknown_is_silent() {
        let mut manager = PickingManager::new();
        let picker = prop_picker(1, point![0.0, 0.0, 0.0]);
        let other = prop_picker(2, point![0.0, 0.0, 0.0]);
        let obj = Some(ObjectId::new());

        manager.add_picker(&picker, obj);
        manager.remove_picker(&other, obj);
        manager.remove_picker(&picker, Some(ObjectId::new()));
        assert_eq!(manager.number_of_objects_linked(Some(&picker)), 1);

        manager.remove_picker(&picker, obj);
        assert_eq!(manager.number_of_pickers(), 0);
    }

    #[test]
    fn dropped_pickers_are_not_kept_alive() {
        let mut manager = PickingManager::new();
        let picker = prop_picker(1, point![0.0, 0.0, 0.0]);
        manager.add_picker(&picker, None);

        drop(picker);
        assert_eq!(manager.number_of_pickers(), 0);
    }

    #[test]
    fn closest_hit_is_selected() {
        let mut manager = PickingManager::new();
        let far = prop_picker(1, point![0.0, 0.0, 0.0]);
        let near = prop_picker(2, point![0.0, 0.0, 5.0]);
        let far_obj = Some(ObjectId::new());
        let near_obj = Some(ObjectId::new());
        manager.add_picker(&far, far_obj);
        manager.add_picker(&near, near_obj);

        assert!(manager.select_picker().is_none());

        let interactor = interactor();
        attach(&mut manager, &interactor);

        let selected = manager.select_picker().unwrap();
        assert!(Arc::ptr_eq(&selected, &near));
        assert!(manager.pick(near_obj));
        assert!(!manager.pick(far_obj));
        assert!(manager.pick_with(&near, near_obj));
        assert!(!manager.pick_with(&far, far_obj));
        assert!(!manager.pick_with(&near, far_obj));

        // Nothing under the pointer
        interactor.lock().set_event_position(1.0, 1.0);
        assert!(manager.select_picker().is_none());
    }

    #[test]
    fn ties_go_to_the_first_picker() {
        let mut manager = PickingManager::new();
        let first = prop_picker(1, point![0.0, 0.0, 0.0]);
        let second = prop_picker(2, point![0.0, 0.0, 0.0]);
        manager.add_picker(&first, None);
        manager.add_picker(&second, None);

        let interactor = interactor();
        attach(&mut manager, &interactor);

        assert!(Arc::ptr_eq(&manager.select_picker().unwrap(), &first));
    }

    #[test]
    fn selection_is_cached_until_next_event() {
        let mut manager = PickingManager::new();
        let picks = Arc::new(Mutex::new(0));
        let mut inner = PropPicker::new();
        inner.add_prop(PropId(1), unit_box(point![0.0, 0.0, 0.0]));
        let picker: SharedPicker = Arc::new(Mutex::new(CountingPicker {
            inner,
            picks: picks.clone(),
        }));
        manager.add_picker(&picker, None);

        let interactor = interactor();
        attach(&mut manager, &interactor);

        assert!(manager.pick(None));
        assert!(manager.pick(None));
        assert_eq!(*picks.lock(), 1);

        interactor.lock().set_event_position(50.0, 51.0);
        assert!(manager.pick(None));
        assert_eq!(*picks.lock(), 2);

        manager.set_optimize_on_interactor_events(false);
        assert!(manager.pick(None));
        assert!(manager.pick(None));
        assert_eq!(*picks.lock(), 4);
    }

    #[test]
    fn assembly_path_respects_selection() {
        let mut manager = PickingManager::new();
        let far = prop_picker(1, point![0.0, 0.0, 0.0]);
        let near = prop_picker(2, point![0.0, 0.0, 5.0]);
        let obj = Some(ObjectId::new());
        manager.add_picker(&far, obj);
        manager.add_picker(&near, obj);

        let interactor = interactor();
        attach(&mut manager, &interactor);
        let viewport = interactor.lock().viewport().clone();

        // Disabled manager, every picker picks on its own
        let path = manager.assembly_path(50.0, 50.0, 0.0, &far, &viewport, obj);
        assert_eq!(path.and_then(|p| p.first()), Some(PropId(1)));

        manager.set_enabled(true);
        assert!(manager
            .assembly_path(50.0, 50.0, 0.0, &far, &viewport, obj)
            .is_none());
        let path = manager.assembly_path(50.0, 50.0, 0.0, &near, &viewport, obj);
        assert_eq!(path.and_then(|p| p.first()), Some(PropId(2)));
    }
}
