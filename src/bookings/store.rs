use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{
    BookingData, BookingKind, BookingSession, Proposal, ProposalForm, ShowcaseBooking,
    ShowcaseSnapshot, SpeedDatingBooking, SpeedDatingSession,
};
use crate::constants::BOOKING_DATA_KEY;
use crate::storage::KeyValueStore;
use crate::utils::StorageError;

/// Append-only store of showcase bookings, speed-dating bookings and proposals
pub struct BookingStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl BookingStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All booking data; unreadable data reads as empty
    pub fn data(&self) -> BookingData {
        let raw = match self.store.get(BOOKING_DATA_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BookingData::default(),
            Err(e) => {
                warn!("Error reading booking data: {}", e);
                return BookingData::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Booking data is corrupt, starting empty: {}", e);
            BookingData::default()
        })
    }

    pub fn showcase_bookings(&self) -> Vec<ShowcaseBooking> {
        self.data().showcase_bookings
    }

    pub fn speed_dating_bookings(&self) -> Vec<SpeedDatingBooking> {
        self.data().speed_dating_bookings
    }

    pub fn proposals(&self) -> Vec<Proposal> {
        self.data().proposals
    }

    /// Record a showcase booking
    pub fn add_showcase_booking(
        &self,
        showcase: ShowcaseSnapshot,
        session: BookingSession,
    ) -> Result<ShowcaseBooking, StorageError> {
        self.append(|data, id| {
            let booking = ShowcaseBooking {
                id,
                showcase,
                session,
                booked_at: Utc::now(),
                kind: BookingKind::Showcase,
            };
            data.showcase_bookings.push(booking.clone());
            booking
        })
    }

    /// Record a speed-dating booking
    pub fn add_speed_dating_booking(
        &self,
        session: SpeedDatingSession,
    ) -> Result<SpeedDatingBooking, StorageError> {
        self.append(|data, id| {
            let booking = SpeedDatingBooking {
                id,
                session,
                booked_at: Utc::now(),
                kind: BookingKind::SpeedDating,
            };
            data.speed_dating_bookings.push(booking.clone());
            booking
        })
    }

    /// Record a generated proposal
    pub fn add_proposal(
        &self,
        showcase: ShowcaseSnapshot,
        form: &ProposalForm,
    ) -> Result<Proposal, StorageError> {
        self.append(|data, id| {
            let proposal = Proposal::from_form(id, showcase, form, Utc::now());
            data.proposals.push(proposal.clone());
            proposal
        })
    }

    /// Remove all booking data
    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        self.store.remove(BOOKING_DATA_KEY)?;
        info!("Cleared booking data");
        Ok(())
    }

    fn append<T, F>(&self, add: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut BookingData, i64) -> T,
    {
        let _guard = self.write_lock.lock();
        let mut data = self.data();
        let id = next_id(&data, Utc::now().timestamp_millis());
        let added = add(&mut data, id);

        let serialized = serde_json::to_string(&data)?;
        self.store.set(BOOKING_DATA_KEY, &serialized)?;
        Ok(added)
    }
}

/// Creation time in epoch millis, bumped past every id already stored
fn next_id(data: &BookingData, now_millis: i64) -> i64 {
    match data.max_id() {
        Some(max) if max >= now_millis => max + 1,
        _ => now_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn showcase() -> ShowcaseSnapshot {
        ShowcaseSnapshot {
            id: Some(3),
            title: "Aesthetic Flow".to_string(),
            artist: "Flow Company".to_string(),
            genre: "music".to_string(),
            duration: Some("50".to_string()),
        }
    }

    fn session() -> BookingSession {
        BookingSession {
            id: 1,
            date: "2025-10-01".to_string(),
            time: "14:00".to_string(),
            venue: "Hall A".to_string(),
        }
    }

    fn store() -> (BookingStore, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        (BookingStore::new(backing.clone()), backing)
    }

    #[test]
    fn test_empty_store() {
        let (bookings, _) = store();
        assert!(bookings.data().is_empty());
        assert!(bookings.proposals().is_empty());
    }

    #[test]
    fn test_add_showcase_booking_snapshots_showcase() {
        let (bookings, _) = store();
        let booking = bookings.add_showcase_booking(showcase(), session()).unwrap();

        assert_eq!(booking.kind, BookingKind::Showcase);
        assert_eq!(bookings.showcase_bookings(), vec![booking]);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let (bookings, _) = store();
        let a = bookings.add_showcase_booking(showcase(), session()).unwrap();
        let b = bookings.add_showcase_booking(showcase(), session()).unwrap();
        let c = bookings
            .add_speed_dating_booking(SpeedDatingSession {
                id: 2,
                date: "2025-10-02".to_string(),
                time: "10:00".to_string(),
                venue: "Lounge".to_string(),
                session: "Morning".to_string(),
            })
            .unwrap();

        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn test_add_proposal_splits_form() {
        let (bookings, _) = store();
        let form = ProposalForm {
            booker_company: "Seoul Arts".to_string(),
            booker_name: "Kim".to_string(),
            venue_name: "Main Stage".to_string(),
            venue_capacity: Some(300),
            ticket_price: Some(30000),
            performance_count: Some(2),
            ..Default::default()
        };

        let proposal = bookings.add_proposal(showcase(), &form).unwrap();
        assert_eq!(proposal.booker_info.company, "Seoul Arts");
        assert_eq!(proposal.venue_info.capacity, Some(300));
        assert_eq!(proposal.performance_details.performance_count, Some(2));
        assert_eq!(bookings.proposals().len(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let (bookings, backing) = store();
        bookings.add_showcase_booking(showcase(), session()).unwrap();
        bookings.add_proposal(showcase(), &ProposalForm::default()).unwrap();

        let raw = backing.get(BOOKING_DATA_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["showcaseBookings"][0]["type"], "showcase");
        assert!(json["showcaseBookings"][0]["bookedAt"].is_string());
        assert_eq!(json["speedDatingBookings"], serde_json::json!([]));
        assert_eq!(json["proposals"][0]["status"], "generated");
        assert!(json["proposals"][0]["bookerInfo"].is_object());
        assert!(json["proposals"][0]["venueInfo"].get("type").is_some());
    }

    #[test]
    fn test_corrupt_data_reads_empty() {
        let (bookings, backing) = store();
        backing.set(BOOKING_DATA_KEY, "[oops").unwrap();
        assert!(bookings.data().is_empty());

        // The next append starts over from the empty layout
        bookings.add_showcase_booking(showcase(), session()).unwrap();
        assert_eq!(bookings.showcase_bookings().len(), 1);
    }

    #[test]
    fn test_write_failure_is_returned() {
        let bookings = BookingStore::new(Arc::new(MemoryStore::with_quota(10)));
        let err = bookings.add_showcase_booking(showcase(), session()).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(bookings.data().is_empty());
    }

    #[test]
    fn test_clear() {
        let (bookings, _) = store();
        bookings.add_showcase_booking(showcase(), session()).unwrap();
        bookings.clear().unwrap();
        assert!(bookings.data().is_empty());
    }

    #[test]
    fn test_next_id_bumps_past_existing() {
        let mut data = BookingData::default();
        assert_eq!(next_id(&data, 1_000), 1_000);

        data.proposals.push(Proposal::from_form(
            5_000,
            showcase(),
            &ProposalForm::default(),
            Utc::now(),
        ));
        assert_eq!(next_id(&data, 1_000), 5_001);
        assert_eq!(next_id(&data, 9_000), 9_000);
    }
}
