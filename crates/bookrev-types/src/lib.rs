pub mod claim;
pub mod general;

pub use general::ValidGuid;
