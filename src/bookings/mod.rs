/// Booking and proposal persistence - Gateway
mod store;
mod types;

pub use store::BookingStore;
pub use types::{
    BookerInfo, BookingData, BookingKind, BookingSession, PerformanceDetails, Proposal,
    ProposalForm, ProposalStatus, ShowcaseBooking, ShowcaseSnapshot, SpeedDatingBooking,
    SpeedDatingSession, VenueInfo,
};
