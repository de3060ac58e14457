use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized showcase details captured when a booking is made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcaseSnapshot {
    pub id: Option<i64>,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSession {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub venue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedDatingSession {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub session: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingKind {
    #[serde(rename = "showcase")]
    Showcase,
    #[serde(rename = "speed-dating")]
    SpeedDating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseBooking {
    pub id: i64,
    pub showcase: ShowcaseSnapshot,
    pub session: BookingSession,
    pub booked_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: BookingKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedDatingBooking {
    pub id: i64,
    pub session: SpeedDatingSession,
    pub booked_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: BookingKind,
}

/// Proposal form as filled in by the booker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalForm {
    pub booker_company: String,
    pub booker_name: String,
    pub booker_email: String,
    pub booker_phone: String,
    pub venue_name: String,
    pub venue_address: String,
    pub venue_capacity: Option<u32>,
    pub venue_type: String,
    pub performance_date: String,
    pub performance_time: String,
    pub ticket_price: Option<u32>,
    pub performance_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookerInfo {
    pub company: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueInfo {
    pub name: String,
    pub address: String,
    pub capacity: Option<u32>,
    #[serde(rename = "type")]
    pub venue_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceDetails {
    pub date: String,
    pub time: String,
    pub ticket_price: Option<u32>,
    pub performance_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: i64,
    pub showcase: ShowcaseSnapshot,
    pub booker_info: BookerInfo,
    pub venue_info: VenueInfo,
    pub performance_details: PerformanceDetails,
    pub generated_at: DateTime<Utc>,
    pub status: ProposalStatus,
}

impl Proposal {
    /// Split a filled-in form into the stored proposal sections
    pub fn from_form(
        id: i64,
        showcase: ShowcaseSnapshot,
        form: &ProposalForm,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            showcase,
            booker_info: BookerInfo {
                company: form.booker_company.clone(),
                name: form.booker_name.clone(),
                email: form.booker_email.clone(),
                phone: form.booker_phone.clone(),
            },
            venue_info: VenueInfo {
                name: form.venue_name.clone(),
                address: form.venue_address.clone(),
                capacity: form.venue_capacity,
                venue_type: form.venue_type.clone(),
            },
            performance_details: PerformanceDetails {
                date: form.performance_date.clone(),
                time: form.performance_time.clone(),
                ticket_price: form.ticket_price,
                performance_count: form.performance_count,
            },
            generated_at,
            status: ProposalStatus::Generated,
        }
    }
}

/// Everything persisted under the booking key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    #[serde(default)]
    pub showcase_bookings: Vec<ShowcaseBooking>,
    #[serde(default)]
    pub speed_dating_bookings: Vec<SpeedDatingBooking>,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

impl BookingData {
    pub fn is_empty(&self) -> bool {
        self.showcase_bookings.is_empty()
            && self.speed_dating_bookings.is_empty()
            && self.proposals.is_empty()
    }

    /// Largest identifier in use, if any
    pub fn max_id(&self) -> Option<i64> {
        let showcase = self.showcase_bookings.iter().map(|b| b.id);
        let speed_dating = self.speed_dating_bookings.iter().map(|b| b.id);
        let proposals = self.proposals.iter().map(|p| p.id);
        showcase.chain(speed_dating).chain(proposals).max()
    }
}
