/// Scalar type tag of volume data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
    /// Bit-packed samples
    Bit,
    /// Textual samples
    String,
    /// Payload of unknown layout
    Unknown,
}

impl ScalarType {
    /// Whether the ray-cast kernel can sample this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, ScalarType::Bit | ScalarType::String | ScalarType::Unknown)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

/// Native sample type the kernel is generic over.
pub trait Scalar: Copy + PartialOrd + Send + Sync + std::fmt::Debug + 'static {
    const TYPE: ScalarType;

    fn to_f64(self) -> f64;

    /// Plain `as` cast to a table index, valid when the index conversion is the identity.
    fn as_index(self) -> u16;
}

macro_rules! impl_scalar {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl Scalar for $t {
                const TYPE: ScalarType = ScalarType::$variant;

                #[inline(always)]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline(always)]
                fn as_index(self) -> u16 {
                    self as u16
                }
            }
        )*
    };
}

impl_scalar!(i8 => I8, u8 => U8, i16 => I16, u16 => U16, i32 => I32, u32 => U32, f32 => F32, f64 => F64);

/// Typed voxel buffer, components interleaved.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// Raw payload of a type the kernel cannot sample
    Opaque {
        scalar_type: ScalarType,
        values: usize,
        bytes: Vec<u8>,
    },
}

/// Expands `$body` once per native scalar type with `$slice` bound to the typed samples.
macro_rules! dispatch_scalars {
    ($data:expr, $slice:ident => $body:expr, opaque => $other:expr) => {
        match $data {
            $crate::volumetric::ScalarData::I8($slice) => $body,
            $crate::volumetric::ScalarData::U8($slice) => $body,
            $crate::volumetric::ScalarData::I16($slice) => $body,
            $crate::volumetric::ScalarData::U16($slice) => $body,
            $crate::volumetric::ScalarData::I32($slice) => $body,
            $crate::volumetric::ScalarData::U32($slice) => $body,
            $crate::volumetric::ScalarData::F32($slice) => $body,
            $crate::volumetric::ScalarData::F64($slice) => $body,
            $crate::volumetric::ScalarData::Opaque { .. } => $other,
        }
    };
}

pub(crate) use dispatch_scalars;

impl ScalarData {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarData::I8(_) => ScalarType::I8,
            ScalarData::U8(_) => ScalarType::U8,
            ScalarData::I16(_) => ScalarType::I16,
            ScalarData::U16(_) => ScalarType::U16,
            ScalarData::I32(_) => ScalarType::I32,
            ScalarData::U32(_) => ScalarType::U32,
            ScalarData::F32(_) => ScalarType::F32,
            ScalarData::F64(_) => ScalarType::F64,
            ScalarData::Opaque { scalar_type, .. } => *scalar_type,
        }
    }

    /// Number of stored values (voxels times components)
    pub fn len(&self) -> usize {
        match self {
            ScalarData::Opaque { values, .. } => *values,
            other => dispatch_scalars!(other, v => v.len(), opaque => 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index` as `f64`, `None` for opaque payloads or out of range
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        dispatch_scalars!(self, v => v.get(index).map(|s| s.to_f64()), opaque => None)
    }
}

macro_rules! impl_from_vec {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Vec<$t>> for ScalarData {
                fn from(v: Vec<$t>) -> Self {
                    ScalarData::$variant(v)
                }
            }
        )*
    };
}

impl_from_vec!(i8 => I8, u8 => U8, i16 => I16, u16 => U16, i32 => I32, u32 => U32, f32 => F32, f64 => F64);
