pub mod adjustments;
pub mod effects;
pub mod filters;
pub mod scripting;
pub mod transform;
