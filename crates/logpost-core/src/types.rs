//! Core types for the log collector.
//!
//! This module provides:
//! - [`Severity`] - Urgency levels for messages
//! - [`Message`] - The canonical log record and its validation rule
//! - [`AuditData`] / [`MetricData`] - Optional structured side data
//! - [`MessageId`] - Store-local sequential identifier
//! - [`StoredMessage`] - A message together with its assigned id

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Store-local sequential identifier, rendered as a decimal string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for MessageId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse().map(Self)
    }
}

/// Message severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Severity {
    /// Debugging detail
    Debug = 0,
    /// Informational
    Info = 1,
    /// Normal but significant condition
    Notice = 2,
    /// Warning condition
    Warning = 3,
    /// Error condition
    Error = 4,
    /// Critical / fatal condition
    Fatal = 5,
    /// Action must be taken immediately
    Alert = 6,
    /// System is unusable
    Emergency = 7,
}

impl Severity {
    /// All severities, least urgent first.
    pub const ALL: [Self; 8] = [
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Fatal,
        Self::Alert,
        Self::Emergency,
    ];

    /// Urgency rank, 0 for `Debug` through 7 for `Emergency`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Info => "Info",
            Self::Notice => "Notice",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
            Self::Alert => "Alert",
            Self::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" | "informational" => Ok(Self::Info),
            "notice" => Ok(Self::Notice),
            "warning" | "warn" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            "fatal" | "critical" | "crit" => Ok(Self::Fatal),
            "alert" => Ok(Self::Alert),
            "emergency" | "emerg" => Ok(Self::Emergency),
            _ => Err(LogError::invalid_parameter(
                "severity",
                format!("unrecognized severity '{s}'"),
            )),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = LogError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Severity> for &'static str {
    fn from(severity: Severity) -> Self {
        severity.as_str()
    }
}

/// Who did what to whom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditData {
    /// Principal performing the action
    #[serde(default)]
    pub actor: String,
    /// Action performed
    #[serde(default)]
    pub action: String,
    /// Object acted upon
    #[serde(default)]
    pub actee: String,
}

/// A single metric observation attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    /// Metric name
    #[serde(default)]
    pub name: String,
    /// Observed value
    #[serde(default)]
    pub value: f64,
    /// Object the metric describes
    #[serde(default)]
    pub object: String,
}

/// A single log entry as submitted by a producer.
///
/// Every field deserializes leniently: absent, `null` and empty values all
/// decode to the zero value, so that [`Message::validate`] can name the
/// first missing field instead of failing inside the JSON decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Producer name
    #[serde(default, deserialize_with = "lenient::string")]
    pub service: String,
    /// Producer network location
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: String,
    /// When the producer created the message
    #[serde(default, alias = "timeStamp", deserialize_with = "lenient::time")]
    pub created_on: DateTime<Utc>,
    /// Urgency
    #[serde(
        default,
        deserialize_with = "lenient::severity",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<Severity>,
    /// Free text
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
    /// Optional audit side data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_data: Option<AuditData>,
    /// Optional metric side data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_data: Option<MetricData>,
}

impl Message {
    /// Creates a new message builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Checks every required field, returning the first one that is empty.
    ///
    /// Fields are checked in the order service, address, createdOn,
    /// severity, message, then audit and metric side data.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::MissingField`] naming the failing field.
    pub fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(LogError::MissingField("service"));
        }
        if self.address.is_empty() {
            return Err(LogError::MissingField("address"));
        }
        if is_zero_time(self.created_on) {
            return Err(LogError::MissingField("createdOn"));
        }
        if self.severity.is_none() {
            return Err(LogError::MissingField("severity"));
        }
        if self.message.is_empty() {
            return Err(LogError::MissingField("message"));
        }

        if let Some(audit) = &self.audit_data {
            if audit.actor.is_empty() {
                return Err(LogError::MissingField("auditData.actor"));
            }
            if audit.action.is_empty() {
                return Err(LogError::MissingField("auditData.action"));
            }
            if audit.actee.is_empty() {
                return Err(LogError::MissingField("auditData.actee"));
            }
        }

        if let Some(metric) = &self.metric_data {
            if metric.name.is_empty() {
                return Err(LogError::MissingField("metricData.name"));
            }
            if !metric.value.is_finite() {
                return Err(LogError::MissingField("metricData.value"));
            }
            if metric.object.is_empty() {
                return Err(LogError::MissingField("metricData.object"));
            }
        }

        Ok(())
    }
}

/// True for the Unix epoch and for the year-1 zero time some producers
/// send in place of an unset timestamp.
fn is_zero_time(time: DateTime<Utc>) -> bool {
    time == DateTime::<Utc>::default() || time.year() <= 1
}

/// Decoders mapping `null` and `""` to the field's zero value.
mod lenient {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::Severity;

    fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()))
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(deserializer)?.unwrap_or_default())
    }

    pub(super) fn time<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        match text(deserializer)? {
            Some(raw) => raw.trim().parse().map_err(D::Error::custom),
            None => Ok(DateTime::default()),
        }
    }

    pub(super) fn severity<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Severity>, D::Error> {
        text(deserializer)?
            .map(|raw| raw.parse().map_err(D::Error::custom))
            .transpose()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}, {}]",
            self.service,
            self.address,
            self.created_on.to_rfc3339(),
            self.severity.map_or("", Severity::as_str),
            self.message
        )
    }
}

/// A message that has been accepted by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Identifier assigned at ingest
    pub id: MessageId,
    /// The message itself
    #[serde(flatten)]
    pub message: Message,
}

/// Builder for constructing messages.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    /// Sets the producing service.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.message.service = service.into();
        self
    }

    /// Sets the producer address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.message.address = address.into();
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.message.created_on = created_on;
        self
    }

    /// Sets the severity.
    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.message.severity = Some(severity);
        self
    }

    /// Sets the message text.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message.message = message.into();
        self
    }

    /// Attaches audit data.
    #[must_use]
    pub fn audit(
        mut self,
        actor: impl Into<String>,
        action: impl Into<String>,
        actee: impl Into<String>,
    ) -> Self {
        self.message.audit_data = Some(AuditData {
            actor: actor.into(),
            action: action.into(),
            actee: actee.into(),
        });
        self
    }

    /// Attaches metric data.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: f64, object: impl Into<String>) -> Self {
        self.message.metric_data = Some(MetricData {
            name: name.into(),
            value,
            object: object.into(),
        });
        self
    }

    /// Builds the message, returning an error if it does not validate.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::MissingField`] for the first empty required field.
    pub fn build(self) -> Result<Message> {
        self.message.validate()?;
        Ok(self.message)
    }
}
