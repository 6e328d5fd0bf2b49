pub type Lengthf32    = f32;
pub type Intensityf32 = f32;
pub type Weightf32    = f32;
pub type Ratiof32     = f32;
pub type Anglef32     = f32;

pub use crate::index::{BoxDim_u, Index1_u, Index3_u};

pub use crate::error::Error;
pub use crate::grid::Grid;
pub use crate::image::Image;
pub use crate::sinogram::Sinogram;
