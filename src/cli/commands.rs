use anyhow::{Context, Result};
use colored::Colorize;

use super::{BookingsAction, CacheAction, ShowcaseArgs, SlotArgs};
use crate::bookings::{
    BookingSession, BookingStore, ProposalForm, ShowcaseSnapshot, SpeedDatingSession,
};
use crate::cache::RecommendationCache;

/// Handle `pams cache ...`
pub fn handle_cache(action: CacheAction, cache: &RecommendationCache) -> Result<()> {
    match action {
        CacheAction::Show => {
            match cache.peek() {
                Some(entry) => {
                    let created = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(entry.timestamp)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| entry.timestamp.to_string());
                    let age_hours =
                        entry.age_millis(chrono::Utc::now().timestamp_millis()) / 3_600_000;
                    let expired = age_hours >= cache.ttl().num_hours();

                    println!("Cached recommendations:");
                    println!("  Created: {} ({}h ago{})", created, age_hours, if expired { ", expired" } else { "" });
                    println!("  Survey:  {}", &entry.survey_hash[..entry.survey_hash.len().min(12)]);
                    if let Some(analysis) = &entry.analysis_results {
                        println!("  Keywords: {}", analysis.keywords.join(", ").cyan());
                    }
                    for item in &entry.recommendations {
                        println!("  {:>2}. {} - {}", item.rank, item.title.bold(), item.artist);
                    }
                }
                None => println!("No cached recommendations."),
            }
            Ok(())
        }
        CacheAction::Clear => {
            cache.clear();
            println!("Recommendation cache cleared.");
            Ok(())
        }
    }
}

/// Handle `pams bookings ...`
pub fn handle_bookings(action: &BookingsAction, bookings: &BookingStore) -> Result<()> {
    match action {
        BookingsAction::List => {
            let data = bookings.data();
            if data.is_empty() {
                println!("No bookings or proposals yet.");
                return Ok(());
            }

            println!("Showcase bookings ({}):", data.showcase_bookings.len());
            for booking in &data.showcase_bookings {
                println!(
                    "  • {} - {} {} @ {} (booked {})",
                    booking.showcase.title.bold(),
                    booking.session.date,
                    booking.session.time,
                    booking.session.venue,
                    booking.booked_at.format("%Y-%m-%d %H:%M")
                );
            }

            println!("Speed dating bookings ({}):", data.speed_dating_bookings.len());
            for booking in &data.speed_dating_bookings {
                println!(
                    "  • {} {} {} @ {}",
                    booking.session.session.bold(),
                    booking.session.date,
                    booking.session.time,
                    booking.session.venue
                );
            }

            println!("Proposals ({}):", data.proposals.len());
            for proposal in &data.proposals {
                println!(
                    "  • {} for {} ({})",
                    proposal.showcase.title.bold(),
                    proposal.booker_info.company,
                    proposal.generated_at.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
        BookingsAction::Showcase { showcase, slot } => {
            let booking = bookings
                .add_showcase_booking(showcase_snapshot(showcase), booking_session(slot))
                .context("Failed to save showcase booking")?;
            println!(
                "{} {} on {} {} (booking {})",
                "Booked".green(),
                booking.showcase.title.bold(),
                booking.session.date,
                booking.session.time,
                booking.id
            );
            Ok(())
        }
        BookingsAction::SpeedDating { session, slot } => {
            let booking = bookings
                .add_speed_dating_booking(SpeedDatingSession {
                    id: slot.session_id,
                    date: slot.date.clone(),
                    time: slot.time.clone(),
                    venue: slot.venue.clone(),
                    session: session.clone(),
                })
                .context("Failed to save speed dating booking")?;
            println!(
                "{} {} on {} {} (booking {})",
                "Booked".green(),
                booking.session.session.bold(),
                booking.session.date,
                booking.session.time,
                booking.id
            );
            Ok(())
        }
        BookingsAction::Proposal { showcase, form } => {
            let raw = std::fs::read_to_string(form)
                .with_context(|| format!("Failed to read proposal form {}", form.display()))?;
            let filled: ProposalForm = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid proposal form {}", form.display()))?;
            let proposal = bookings
                .add_proposal(showcase_snapshot(showcase), &filled)
                .context("Failed to save proposal")?;
            println!(
                "{} proposal for {} (proposal {})",
                "Generated".green(),
                proposal.showcase.title.bold(),
                proposal.id
            );
            Ok(())
        }
        BookingsAction::Clear => {
            bookings.clear()?;
            println!("Booking data cleared.");
            Ok(())
        }
    }
}

fn showcase_snapshot(args: &ShowcaseArgs) -> ShowcaseSnapshot {
    ShowcaseSnapshot {
        id: args.showcase_id,
        title: args.title.clone(),
        artist: args.artist.clone(),
        genre: args.genre.clone(),
        duration: args.duration.clone(),
    }
}

fn booking_session(slot: &SlotArgs) -> BookingSession {
    BookingSession {
        id: slot.session_id,
        date: slot.date.clone(),
        time: slot.time.clone(),
        venue: slot.venue.clone(),
    }
}

/// Show version information
pub fn show_version() {
    println!("pams v{}", env!("CARGO_PKG_VERSION"));
    println!("   Showcase recommendations and bookings for the PAMS marketplace");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn showcase() -> ShowcaseArgs {
        ShowcaseArgs {
            showcase_id: Some(3),
            title: "BARCODE".to_string(),
            artist: "Company B".to_string(),
            genre: "dance".to_string(),
            duration: None,
        }
    }

    fn slot() -> SlotArgs {
        SlotArgs {
            session_id: 1,
            date: "2025-10-01".to_string(),
            time: "19:00".to_string(),
            venue: "Arko Theater".to_string(),
        }
    }

    #[test]
    fn test_bookings_are_added_through_commands() {
        let bookings = BookingStore::new(Arc::new(MemoryStore::new()));

        handle_bookings(
            &BookingsAction::Showcase { showcase: showcase(), slot: slot() },
            &bookings,
        )
        .unwrap();
        handle_bookings(
            &BookingsAction::SpeedDating { session: "Session A".to_string(), slot: slot() },
            &bookings,
        )
        .unwrap();

        let data = bookings.data();
        assert_eq!(data.showcase_bookings.len(), 1);
        assert_eq!(data.showcase_bookings[0].showcase.title, "BARCODE");
        assert_eq!(data.showcase_bookings[0].session.venue, "Arko Theater");
        assert_eq!(data.speed_dating_bookings.len(), 1);
        assert_eq!(data.speed_dating_bookings[0].session.session, "Session A");

        handle_bookings(&BookingsAction::Clear, &bookings).unwrap();
        assert!(bookings.data().is_empty());
    }

    #[test]
    fn test_proposal_is_read_from_form_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let form = dir.path().join("form.json");
        std::fs::write(
            &form,
            r#"{
                "bookerCompany": "Seoul Arts", "bookerName": "Kim", "bookerEmail": "kim@example.com",
                "bookerPhone": "010-0000-0000", "venueName": "Hall A", "venueAddress": "Jongno",
                "venueCapacity": 300, "venueType": "theater", "performanceDate": "2025-11-01",
                "performanceTime": "19:30", "ticketPrice": 30000, "performanceCount": 2
            }"#,
        )
        .unwrap();

        let bookings = BookingStore::new(Arc::new(MemoryStore::new()));
        handle_bookings(&BookingsAction::Proposal { showcase: showcase(), form }, &bookings)
            .unwrap();

        let proposals = bookings.proposals();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].booker_info.company, "Seoul Arts");
        assert_eq!(proposals[0].venue_info.capacity, Some(300));
    }

    #[test]
    fn test_bad_proposal_form_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let form = dir.path().join("form.json");
        std::fs::write(&form, "not json").unwrap();

        let bookings = BookingStore::new(Arc::new(MemoryStore::new()));
        let action = BookingsAction::Proposal { showcase: showcase(), form };
        assert!(handle_bookings(&action, &bookings).is_err());
        assert!(bookings.proposals().is_empty());
    }
}
