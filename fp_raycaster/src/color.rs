use nalgebra::{vector, Vector3};

/// Linear RGB, channels in `<0;1>`
pub type RGB = Vector3<f32>;

pub fn new(r: f32, g: f32, b: f32) -> RGB {
    vector![r, g, b]
}

pub fn black() -> RGB {
    vector![0.0, 0.0, 0.0]
}

pub fn white() -> RGB {
    vector![1.0, 1.0, 1.0]
}

pub fn mono(v: f32) -> RGB {
    vector![v, v, v]
}
