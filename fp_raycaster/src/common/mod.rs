mod bound_box;
mod ray;
mod time_stamp;
mod value_range;
mod viewport_box;

pub use bound_box::{BoundBox, BoundBoxIterator};
pub use ray::Ray;
pub use time_stamp::TimeStamp;
pub use value_range::ValueRange;
pub use viewport_box::ViewportBox;
