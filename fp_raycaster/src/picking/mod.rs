//! Coordination of competing pickers.

mod interactor;
mod manager;
mod picker;

pub use interactor::{Interactor, SharedInteractor, ViewportInteractor};
pub use manager::PickingManager;
pub use picker::{
    shared_picker, AssemblyPath, ObjectId, PickHit, PickRenderer, PickableProp, Picker, PropId,
    PropPicker, SharedPicker, Viewport,
};
