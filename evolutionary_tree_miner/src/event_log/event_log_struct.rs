use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constants::{ACTIVITY_NAME, TIMESTAMP_NAME, TRACE_ID_NAME};

///
/// Possible attribute values of traces and events
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "type", content = "content")]
pub enum AttributeValue {
    /// String values
    String(String),
    /// `DateTime` values
    Date(DateTime<FixedOffset>),
    /// Integer values
    Int(i64),
    /// Float values
    Float(f64),
    /// Boolean values
    Boolean(bool),
    /// IDs (UUIDs)
    ID(Uuid),
}

impl AttributeValue {
    /// Try to get the value as a string
    pub fn try_as_string(&self) -> Option<&String> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a date
    pub fn try_as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttributeValue::Date(d) => Some(d),
            _ => None,
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Date(d) => write!(f, "{}", d),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::ID(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T> From<DateTime<T>> for AttributeValue
where
    T: chrono::TimeZone,
{
    fn from(value: DateTime<T>) -> Self {
        Self::Date(value.fixed_offset())
    }
}

///
/// Attribute made up of a key and a value
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Attribute {
    /// Attribute key
    pub key: String,
    /// Attribute value
    pub value: AttributeValue,
}

impl Attribute {
    /// Helper to create a new attribute
    pub fn new<K: Into<String>, V: Into<AttributeValue>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Attributes are a list of [`Attribute`]s (looked up by key)
pub type Attributes = Vec<Attribute>;

///
/// Lookup of attributes by key
///
pub trait AttributeLookup {
    ///
    /// Get an attribute by key
    ///
    /// _Complexity_: Does linear lookup (i.e., in O(n)).
    fn get_by_key(&self, key: &str) -> Option<&Attribute>;
}

impl AttributeLookup for Attributes {
    fn get_by_key(&self, key: &str) -> Option<&Attribute> {
        self.iter().find(|attr| attr.key == key)
    }
}

///
/// An event consists of multiple (event) attributes ([`Attributes`])
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Event {
    /// Event attributes
    pub attributes: Attributes,
}

impl Event {
    /// Event with only an activity attribute
    pub fn new<S: Into<String>>(activity: S) -> Self {
        let activity: String = activity.into();
        Self {
            attributes: vec![Attribute::new(ACTIVITY_NAME, activity)],
        }
    }

    /// Add a timestamp attribute
    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.attributes.push(Attribute::new(TIMESTAMP_NAME, timestamp));
        self
    }

    /// The activity of this event (a string-valued [`ACTIVITY_NAME`] attribute)
    pub fn activity(&self) -> Option<&str> {
        self.attributes
            .get_by_key(ACTIVITY_NAME)
            .and_then(|a| a.value.try_as_string())
            .map(String::as_str)
    }
}

///
/// A trace is a sequence of [`Event`]s with trace attributes
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Trace {
    /// Trace attributes
    pub attributes: Attributes,
    /// Events contained in trace
    pub events: Vec<Event>,
}

impl Trace {
    /// Activities of all events (events without activity are skipped)
    pub fn activities(&self) -> impl Iterator<Item = &str> + '_ {
        self.events.iter().filter_map(Event::activity)
    }
}

///
/// Event log consisting of a list of [`Trace`]s and log [`Attributes`]
///
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EventLog {
    /// Top-level attributes
    pub attributes: Attributes,
    /// Traces contained in the log
    pub traces: Vec<Trace>,
}

impl EventLog {
    ///
    /// Build an event log with one trace per activity sequence
    ///
    /// Traces get a generated case identifier as [`TRACE_ID_NAME`] attribute.
    ///
    /// ```
    /// use evolutionary_tree_miner::event_log::event_log_struct::EventLog;
    ///
    /// let log = EventLog::from_activity_sequences(&[vec!["a", "b"], vec!["a", "c"]]);
    /// assert_eq!(log.traces.len(), 2);
    /// ```
    pub fn from_activity_sequences<S: AsRef<str>>(sequences: &[Vec<S>]) -> Self {
        let traces = sequences
            .iter()
            .map(|sequence| Trace {
                attributes: vec![Attribute::new(TRACE_ID_NAME, Uuid::new_v4().to_string())],
                events: sequence.iter().map(|a| Event::new(a.as_ref())).collect(),
            })
            .collect();
        Self {
            attributes: Vec::new(),
            traces,
        }
    }

    ///
    /// Distinct activities of the log, in order of first occurrence
    ///
    pub fn get_set_of_activities(&self) -> Vec<String> {
        let mut activities: Vec<String> = Vec::new();
        for activity in self.traces.iter().flat_map(Trace::activities) {
            if !activities.iter().any(|a| a == activity) {
                activities.push(activity.to_string());
            }
        }
        activities
    }

    /// Import an event log from JSON
    pub fn import_json_from_reader<R: Read>(reader: R) -> Result<Self, EventLogIOError> {
        Ok(serde_json::from_reader(BufReader::new(reader))?)
    }

    /// Import an event log from a JSON file
    pub fn import_json_from_path<P: AsRef<Path>>(path: P) -> Result<Self, EventLogIOError> {
        Self::import_json_from_reader(File::open(path)?)
    }

    /// Export the event log as JSON
    pub fn export_json_to_writer<W: Write>(&self, writer: W) -> Result<(), EventLogIOError> {
        Ok(serde_json::to_writer(writer, self)?)
    }
}

/// Error type for [`EventLog`] IO operations
#[derive(Debug)]
pub enum EventLogIOError {
    /// IO Error
    Io(std::io::Error),
    /// JSON Parsing Error
    Json(serde_json::Error),
}

impl Display for EventLogIOError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLogIOError::Io(e) => write!(f, "IO Error: {}", e),
            EventLogIOError::Json(e) => write!(f, "JSON Error: {}", e),
        }
    }
}

impl std::error::Error for EventLogIOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EventLogIOError::Io(e) => Some(e),
            EventLogIOError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for EventLogIOError {
    fn from(e: std::io::Error) -> Self {
        EventLogIOError::Io(e)
    }
}

impl From<serde_json::Error> for EventLogIOError {
    fn from(e: serde_json::Error) -> Self {
        EventLogIOError::Json(e)
    }
}
