mod color_function;
mod piecewise;
mod property;
pub mod tables;

pub use color_function::ColorTransferFunction;
pub use piecewise::PiecewiseFunction;
pub use property::{ComponentProperty, Interpolation, VolumeProperty};
pub use tables::{ComponentTables, ScalarConversion, TransferFunctionTables, MAX_TABLE_SIZE};
