// src/sample.rs

use std::fmt::{Debug, Display};

/// A floating-point audio sample that can live in a [`FreeQueue`](crate::FreeQueue).
///
/// The boundary-crossing build stores `f32`; in-process users may pick `f64`.
pub trait Sample: Copy + Default + PartialEq + Debug + Display + Send + 'static {
    const ZERO: Self;
}

impl Sample for f32 {
    const ZERO: Self = 0.0;
}

impl Sample for f64 {
    const ZERO: Self = 0.0;
}
