//! 3D geometry kernel: points, quaternions, coordinate frames, primitives and fitting.
//!
//! - [`algebra`]: value types and their batched forms
//! - [`optim`]: Levenberg-Marquardt least squares
//! - [`fit`]: fitting lines, planes and circles to point sets

#[doc(inline)]
pub use geom3d_algebra as algebra;

#[doc(inline)]
pub use geom3d_optim as optim;

#[doc(inline)]
pub use geom3d_fit as fit;
