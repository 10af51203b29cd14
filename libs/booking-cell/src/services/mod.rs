pub mod conflict;
pub mod reservation;

pub use reservation::SlotReservationService;
