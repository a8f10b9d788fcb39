/// Common identifying field for event identities (i.e., activities)
///
/// _Note_: Events without a string-valued `concept:name` attribute are ignored when activities
/// are extracted from a log.
pub const ACTIVITY_NAME: &str = "concept:name";
/// Common identifying field for trace identities (i.e., trace IDs)
pub const TRACE_ID_NAME: &str = "concept:name";
/// Common field for the time of an event
pub const TIMESTAMP_NAME: &str = "time:timestamp";
