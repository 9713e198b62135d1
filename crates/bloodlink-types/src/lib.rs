pub mod api;
pub mod blood;
pub mod events;
pub mod models;

pub use blood::BloodType;
