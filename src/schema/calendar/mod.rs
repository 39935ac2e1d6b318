pub mod models;

// Re-export commonly used types
pub use models::{Job, JobStatus, Meeting, MeetingAttendee, MeetingStatus, DEFAULT_RSVP};
