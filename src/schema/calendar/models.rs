use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::clock::Clock;
use crate::schema::reader::FieldReader;
use crate::schema::validation::ValidationError;
use crate::schema::Record;

/// Job status enum representing the state of a scheduled job
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

/// Default RSVP status of an attendee who has not replied
pub const DEFAULT_RSVP: &str = "pending";

/// Attendee embedded in a meeting. Has no identity of its own.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingAttendee {
    pub user_id: String,
    pub name: String,
    /// Not checked for shape
    pub email: String,
    /// Free-form RSVP status
    pub status: String,
}

impl MeetingAttendee {
    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let user_id = r.required_str("userId");
        let name = r.required_str("name");
        let email = r.required_str("email");
        let status = r.str_or("status", DEFAULT_RSVP);

        Some(Self {
            user_id: user_id?,
            name: name?,
            email: email?,
            status: status?,
        })
    }
}

impl Record for MeetingAttendee {
    const KIND: &'static str = "MeetingAttendee";

    fn from_raw_with(raw: &Value, _clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;
        match Self::read(&mut r) {
            Some(attendee) if r.is_clean() => Ok(attendee),
            _ => Err(r.into_error()),
        }
    }
}

/// A job assigned to a worker for a client
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub client_id: String,
    pub assigned_to: String,
    pub start_time: DateTime<Utc>,
    /// Not checked against `start_time`
    pub end_time: DateTime<Utc>,
    pub status: JobStatus,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Copy of this job with `status` replaced and `updated_at` bumped.
    /// Transition legality is left to the caller.
    pub fn with_status(&self, status: JobStatus, clock: &dyn Clock) -> Self {
        Self {
            status,
            updated_at: clock.now(),
            ..self.clone()
        }
    }
}

impl Record for Job {
    const KIND: &'static str = "Job";

    fn from_raw_with(raw: &Value, clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let id = r.identifier();
        let title = r.required_str("title");
        let client_id = r.required_str("clientId");
        let assigned_to = r.required_str("assignedTo");
        let start_time = r.required_timestamp("startTime");
        let end_time = r.required_timestamp("endTime");
        let status = r.label_or("status", JobStatus::default());
        let location = r.optional_str("location");
        let description = r.optional_str("description");
        let created_at = r.timestamp_or_now("createdAt", clock);
        let updated_at = r.timestamp_or_now("updatedAt", clock);

        match (
            id,
            title,
            client_id,
            assigned_to,
            start_time,
            end_time,
            status,
            created_at,
            updated_at,
        ) {
            (
                Some(id),
                Some(title),
                Some(client_id),
                Some(assigned_to),
                Some(start_time),
                Some(end_time),
                Some(status),
                Some(created_at),
                Some(updated_at),
            ) if r.is_clean() => Ok(Self {
                id,
                title,
                client_id,
                assigned_to,
                start_time,
                end_time,
                status,
                location,
                description,
                created_at,
                updated_at,
            }),
            _ => Err(r.into_error()),
        }
    }
}

/// A calendar meeting with its attendees embedded by value
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub attendees: Vec<MeetingAttendee>,
    pub organizer_id: String,
    pub status: MeetingStatus,
    /// Event id assigned by the external calendar integration
    pub google_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn with_status(&self, status: MeetingStatus, clock: &dyn Clock) -> Self {
        Self {
            status,
            updated_at: clock.now(),
            ..self.clone()
        }
    }
}

impl Record for Meeting {
    const KIND: &'static str = "Meeting";

    fn from_raw_with(raw: &Value, clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let id = r.identifier();
        let title = r.required_str("title");
        let description = r.optional_str("description");
        let start_time = r.required_timestamp("startTime");
        let end_time = r.required_timestamp("endTime");
        let location = r.optional_str("location");
        let attendees = r.list("attendees", MeetingAttendee::read);
        let organizer_id = r.required_str("organizerId");
        let status = r.label_or("status", MeetingStatus::default());
        let google_event_id = r.optional_str("googleEventId");
        let created_at = r.timestamp_or_now("createdAt", clock);
        let updated_at = r.timestamp_or_now("updatedAt", clock);

        match (
            id,
            title,
            start_time,
            end_time,
            attendees,
            organizer_id,
            status,
            created_at,
            updated_at,
        ) {
            (
                Some(id),
                Some(title),
                Some(start_time),
                Some(end_time),
                Some(attendees),
                Some(organizer_id),
                Some(status),
                Some(created_at),
                Some(updated_at),
            ) if r.is_clean() => Ok(Self {
                id,
                title,
                description,
                start_time,
                end_time,
                location,
                attendees,
                organizer_id,
                status,
                google_event_id,
                created_at,
                updated_at,
            }),
            _ => Err(r.into_error()),
        }
    }
}
