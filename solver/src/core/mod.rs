mod domains;

pub use domains::*;

use crate::create_ref_type;

/// Type of the values held by finite-domain cells.
pub type IntCst = i32;

create_ref_type!(CellId);
