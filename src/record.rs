// Copyright (C) 2025-2026 the tracing-amqp authors
//
// This file is part of tracing-amqp.
//
// tracing-amqp is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tracing-amqp is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-amqp.  If
// not, see <http://www.gnu.org/licenses/>.

//! The canonical log record & its construction from a [`tracing`] [`Event`].
//!
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! One [`Record`] is built per emitted event: the required `level`, `message` & `logger_name`
//! fields, optionally a transcoded `stacktrace`, optionally the event's context properties after
//! filtering, and finally the `ApiName` tag. Construction cannot fail; anything that would be
//! unserializable is skipped or flattened to its string form instead.

use crate::config::{is_blank, AmqpConfig, DEFAULT_API_NAME};
use crate::error::{Error, Result};
use crate::report::DiagnosticSink;

use backtrace::Backtrace;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};

/// Event field carrying an exception's trace text, by convention. It gates stack-trace emission
/// and is never treated as an ordinary context property.
pub const EXCEPTION_FIELD: &str = "exception";

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        frame transcoding                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// No intermediate-representation offsets exist on a native target; the field is retained with
/// this sentinel so the wire shape stays stable for existing consumers.
const OFFSET_UNKNOWN: i64 = -1;

/// One call-stack frame in serializable shape.
#[derive(Debug, Serialize)]
pub struct Frame {
    pub filename: Option<String>,
    pub line: u32,
    pub column: u32,
    pub method: String,
    pub il_offset: i64,
    pub native_offset: i64,
}

/// Capture & transcode the *current* execution call stack.
///
/// Note that this is the stack at publish time, not the frames of whatever exception triggered
/// the capture.
pub fn capture_stacktrace() -> Vec<Frame> {
    let trace = Backtrace::new();
    let mut frames = Vec::new();
    for frame in trace.frames() {
        let native_offset =
            (frame.ip() as usize).wrapping_sub(frame.symbol_address() as usize) as i64;
        if frame.symbols().is_empty() {
            // Unresolvable frames still occupy a slot, as they do in the stack itself.
            frames.push(Frame {
                filename: None,
                line: 0,
                column: 0,
                method: String::from("<unknown>"),
                il_offset: OFFSET_UNKNOWN,
                native_offset,
            });
            continue;
        }
        for symbol in frame.symbols() {
            frames.push(Frame {
                filename: symbol.filename().map(|path| path.display().to_string()),
                line: symbol.lineno().unwrap_or(0),
                column: symbol.colno().unwrap_or(0),
                method: symbol
                    .name()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| String::from("<unknown>")),
                il_offset: OFFSET_UNKNOWN,
                native_offset,
            });
        }
    }
    frames
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         struct EventData                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Everything the record builder consumes from one emitted event.
///
/// The host framework has already rendered the message text; the property bag is whatever fields
/// the event carried beyond `message` & [`EXCEPTION_FIELD`], with values restricted to a closed
/// set (JSON scalar, or the string form of anything else).
#[derive(Debug, Default)]
pub struct EventData {
    pub level: String,
    pub logger_name: String,
    pub message: String,
    pub exception: Option<String>,
    pub properties: Vec<(String, Value)>,
}

impl EventData {
    pub fn from_event(event: &tracing::Event<'_>, meta: &tracing::Metadata<'_>) -> EventData {
        let mut data = EventData {
            level: meta.level().to_string(),
            logger_name: meta.target().to_string(),
            ..EventData::default()
        };
        let mut visitor = FieldVisitor { data: &mut data };
        event.record(&mut visitor);
        data
    }

    /// The raw, unfiltered event as one JSON line, for the diagnostic sink.
    pub fn raw_json(&self) -> String {
        let mut map = Map::new();
        map.insert("level".to_string(), Value::String(self.level.clone()));
        map.insert("message".to_string(), Value::String(self.message.clone()));
        map.insert(
            "logger_name".to_string(),
            Value::String(self.logger_name.clone()),
        );
        if let Some(exception) = &self.exception {
            map.insert(
                EXCEPTION_FIELD.to_string(),
                Value::String(exception.clone()),
            );
        }
        for (key, value) in &self.properties {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map).to_string()
    }
}

struct FieldVisitor<'a> {
    data: &'a mut EventData,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.data.message = value.to_string(),
            EXCEPTION_FIELD => self.data.exception = Some(value.to_string()),
            name => self
                .data
                .properties
                .push((name.to_string(), Value::String(value.to_string()))),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.data
            .properties
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.data
            .properties
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // A non-finite float has no JSON representation & becomes null (then elided downstream).
        self.data
            .properties
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.data
            .properties
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // The tracing macros pre-format the message field into `std::fmt::Arguments`, so the
        // debug rendering carries no enclosing quotes.
        match field.name() {
            "message" => self.data.message = format!("{:?}", value),
            EXCEPTION_FIELD => self.data.exception = Some(format!("{:?}", value)),
            name => self
                .data
                .properties
                .push((name.to_string(), Value::String(format!("{:?}", value)))),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Record                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The structured mapping produced per log event, serialized for transport.
///
/// Keys are unique; a context property sharing a name with a reserved field silently overwrites
/// it (last write wins). The backing map is ordered, so serializing the same record twice yields
/// byte-identical output.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Assemble the record for one event. Cannot fail: null property values are skipped & any
    /// non-scalar value is flattened to its string form.
    pub fn build(
        event: &EventData,
        config: &AmqpConfig,
        diagnostics: &dyn DiagnosticSink,
    ) -> Record {
        let mut record = Map::new();
        record.insert("level".to_string(), Value::String(event.level.clone()));
        record.insert("message".to_string(), Value::String(event.message.clone()));
        record.insert(
            "logger_name".to_string(),
            Value::String(event.logger_name.clone()),
        );

        let trace_available = event
            .exception
            .as_deref()
            .map(|trace| !is_blank(trace))
            .unwrap_or(false);
        if config.emit_stack_trace_when_available && trace_available {
            if let Ok(frames) = serde_json::to_value(capture_stacktrace()) {
                record.insert("stacktrace".to_string(), frames);
            }
        }

        if config.include_all_properties && !event.properties.is_empty() {
            for (key, value) in &event.properties {
                if value.is_null() {
                    continue;
                }
                if config.property_filter.allows(key) {
                    record.insert(key.clone(), serialize_property_value(value));
                }
            }
        }

        let api_name = if is_blank(&config.api_name) {
            diagnostics.notice("ApiName was empty, fill with value [Default_ApiName]");
            DEFAULT_API_NAME
        } else {
            config.api_name.as_str()
        };
        record.insert("ApiName".to_string(), Value::String(api_name.to_string()));

        Record(record)
    }

    /// Serialize to the UTF-8 JSON bytes that go on the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| Error::Serialize {
            source: Box::new(err),
            back: Backtrace::new(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The serialization-value decision: scalars pass through untouched; anything structured is
/// flattened to its string form rather than reflected on.
fn serialize_property_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use std::sync::Mutex;

    /// Captures notices in memory so assertions don't depend on process-wide stdout.
    #[derive(Default)]
    struct VecSink(Mutex<Vec<String>>);

    impl VecSink {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl DiagnosticSink for VecSink {
        fn notice(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn event(properties: Vec<(String, Value)>) -> EventData {
        EventData {
            level: "ERROR".to_string(),
            logger_name: "svc.io".to_string(),
            message: "disk full".to_string(),
            exception: None,
            properties,
        }
    }

    #[test]
    fn minimal_record_has_exactly_the_required_fields() {
        let sink = VecSink::default();
        let record = Record::build(&event(vec![]), &AmqpConfig::default(), &sink);

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("level"), Some(&Value::from("ERROR")));
        assert_eq!(record.get("message"), Some(&Value::from("disk full")));
        assert_eq!(record.get("logger_name"), Some(&Value::from("svc.io")));
        assert_eq!(record.get("ApiName"), Some(&Value::from(DEFAULT_API_NAME)));
    }

    #[test]
    fn blank_api_name_substitutes_the_sentinel_and_notices_once() {
        let sink = VecSink::default();
        let _record = Record::build(&event(vec![]), &AmqpConfig::default(), &sink);

        let notices = sink.lines();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0],
            "ApiName was empty, fill with value [Default_ApiName]"
        );
    }

    #[test]
    fn configured_api_name_is_used_verbatim_without_notice() {
        let sink = VecSink::default();
        let config = AmqpConfig::builder()
            .api_name("inventory-api".to_string())
            .build();
        let record = Record::build(&event(vec![]), &config, &sink);

        assert_eq!(record.get("ApiName"), Some(&Value::from("inventory-api")));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn properties_are_ignored_unless_inclusion_is_enabled() {
        let sink = VecSink::default();
        let properties = vec![("request_id".to_string(), Value::from(42))];
        let record = Record::build(&event(properties), &AmqpConfig::default(), &sink);

        assert_eq!(record.len(), 4);
        assert!(record.get("request_id").is_none());
    }

    #[test]
    fn filter_round_trip_keeps_matching_keys_only() {
        let sink = VecSink::default();
        let config = AmqpConfig::builder()
            .include_all_properties(true)
            .property_filter("a")
            .unwrap()
            .build();

        // Same property set in both insertion orders; the outcome must not depend on it.
        for properties in [
            vec![
                ("a".to_string(), Value::from(1)),
                ("b".to_string(), Value::from(2)),
            ],
            vec![
                ("b".to_string(), Value::from(2)),
                ("a".to_string(), Value::from(1)),
            ],
        ] {
            let record = Record::build(&event(properties), &config, &sink);
            assert_eq!(record.get("a"), Some(&Value::from(1)));
            assert!(record.get("b").is_none());
        }
    }

    #[test]
    fn null_valued_properties_never_appear() {
        let sink = VecSink::default();
        let config = AmqpConfig::builder().include_all_properties(true).build();
        let properties = vec![
            ("present".to_string(), Value::from("yes")),
            ("absent".to_string(), Value::Null),
        ];
        let record = Record::build(&event(properties), &config, &sink);

        assert_eq!(record.get("present"), Some(&Value::from("yes")));
        assert!(record.get("absent").is_none());
    }

    #[test]
    fn structured_property_values_flatten_to_strings() {
        let sink = VecSink::default();
        let config = AmqpConfig::builder().include_all_properties(true).build();
        let nested = serde_json::json!({"code": 507});
        let properties = vec![("detail".to_string(), nested)];
        let record = Record::build(&event(properties), &config, &sink);

        let value = record.get("detail").unwrap();
        assert!(value.is_string());
        assert_eq!(value.as_str().unwrap(), r#"{"code":507}"#);
    }

    #[test]
    fn a_property_may_overwrite_a_reserved_field() {
        // Last write wins; reserved names get no special protection.
        let sink = VecSink::default();
        let config = AmqpConfig::builder().include_all_properties(true).build();
        let properties = vec![("message".to_string(), Value::from("overridden"))];
        let record = Record::build(&event(properties), &config, &sink);

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("message"), Some(&Value::from("overridden")));
    }

    #[test]
    fn stacktrace_requires_both_the_flag_and_a_non_blank_trace() {
        let sink = VecSink::default();
        let enabled = AmqpConfig::builder()
            .emit_stack_trace_when_available(true)
            .build();

        let mut with_exception = event(vec![]);
        with_exception.exception = Some("boom at line 7".to_string());
        let record = Record::build(&with_exception, &enabled, &sink);
        let frames = record.get("stacktrace").unwrap().as_array().unwrap();
        assert!(!frames.is_empty());
        for frame in frames {
            let frame = frame.as_object().unwrap();
            for key in [
                "filename",
                "line",
                "column",
                "method",
                "il_offset",
                "native_offset",
            ] {
                assert!(frame.contains_key(key), "missing frame key {}", key);
            }
        }

        // No exception at all.
        let record = Record::build(&event(vec![]), &enabled, &sink);
        assert!(record.get("stacktrace").is_none());

        // A whitespace-only trace does not count.
        let mut blank_exception = event(vec![]);
        blank_exception.exception = Some("   ".to_string());
        let record = Record::build(&blank_exception, &enabled, &sink);
        assert!(record.get("stacktrace").is_none());

        // Flag off, exception present.
        let record = Record::build(&with_exception, &AmqpConfig::default(), &sink);
        assert!(record.get("stacktrace").is_none());
    }

    #[test]
    fn serialization_is_deterministic() {
        let sink = VecSink::default();
        let config = AmqpConfig::builder().include_all_properties(true).build();
        let forward = event(vec![
            ("alpha".to_string(), Value::from(1)),
            ("beta".to_string(), Value::from(2)),
        ]);
        let reversed = event(vec![
            ("beta".to_string(), Value::from(2)),
            ("alpha".to_string(), Value::from(1)),
        ]);

        let record = Record::build(&forward, &config, &sink);
        assert_eq!(record.to_bytes().unwrap(), record.to_bytes().unwrap());

        // Key order is canonical, so insertion order leaves no trace in the bytes.
        let record_reversed = Record::build(&reversed, &config, &sink);
        assert_eq!(
            record.to_bytes().unwrap(),
            record_reversed.to_bytes().unwrap()
        );
    }

    #[test]
    fn raw_json_carries_the_unfiltered_event() {
        let mut data = event(vec![("secret".to_string(), Value::from("hunter2"))]);
        data.exception = Some("boom".to_string());
        let raw: Value = serde_json::from_str(&data.raw_json()).unwrap();

        assert_eq!(raw["level"], "ERROR");
        assert_eq!(raw["message"], "disk full");
        assert_eq!(raw["logger_name"], "svc.io");
        assert_eq!(raw["exception"], "boom");
        // The dump ignores the filter & inclusion flags entirely.
        assert_eq!(raw["secret"], "hunter2");
    }
}
