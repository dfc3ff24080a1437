pub mod advanced;
pub mod pipeline;
pub mod reference;
pub mod transform;
