pub mod booking;
pub mod clinics;
pub mod lifecycle;
pub mod slots;
