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

//! [tracing-amqp](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! One [`Layer`] is the whole adapter: it owns the configuration, the lazily-created broker
//! channel & the two reporting seams. Every event the subscriber hands it becomes one build +
//! publish cycle, and no failure along the way ever escapes to the logging call site.

use crate::config::{is_blank, AmqpConfig, DEFAULT_EXCHANGE_NAME, ROUTING_KEY};
use crate::record::{EventData, Record};
use crate::report::{DiagnosticSink, ErrorReporter, StderrReporter, StdoutSink};
use crate::transport::{AmqpConnector, Connect, Transport};

use tracing::Event;
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to recover the original logger
// name from events that were bridged from the `log` crate. This follows the same pattern used by
// tracing-subscriber's fmt layer.
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

use std::sync::Mutex;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that republishes [`Event`]s as
/// JSON records on an AMQP exchange.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// The broker channel is created lazily on the first publish attempt (or the first attempt after
/// a failed creation) & reused for the life of the process. Creation and publishing are
/// serialized behind one lock, so concurrent first use still produces exactly one connection;
/// the consequence is that publishes from different threads queue behind each other & behind the
/// network round-trip, which has no timeout.
pub struct Layer<C: Connect> {
    config: AmqpConfig,
    connector: C,
    transport: Mutex<Option<C::Transport>>,
    reporter: Box<dyn ErrorReporter + Send + Sync>,
    diagnostics: Box<dyn DiagnosticSink + Send + Sync>,
}

impl Layer<AmqpConnector> {
    /// Construct a [`Layer`] that will publish to the broker described by `config`, reporting
    /// failures on stderr & notices on stdout.
    pub fn new(config: AmqpConfig) -> Layer<AmqpConnector> {
        let connector = AmqpConnector::new(config.clone());
        Layer::with_connector(config, connector)
    }
}

impl<C: Connect> Layer<C> {
    /// Construct a [`Layer`] with a custom [`Connect`] implementation.
    pub fn with_connector(config: AmqpConfig, connector: C) -> Layer<C> {
        Layer {
            config,
            connector,
            transport: Mutex::new(None),
            reporter: Box::new(StderrReporter),
            diagnostics: Box::new(StdoutSink),
        }
    }

    /// Route failure reports somewhere other than stderr.
    pub fn with_error_reporter<R: ErrorReporter + Send + Sync + 'static>(
        mut self,
        reporter: R,
    ) -> Layer<C> {
        self.reporter = Box::new(reporter);
        self
    }

    /// Route console notices & raw event dumps somewhere other than stdout.
    pub fn with_diagnostics<D: DiagnosticSink + Send + Sync + 'static>(
        mut self,
        diagnostics: D,
    ) -> Layer<C> {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// One publish attempt: dump the raw event, make sure a channel exists, serialize & send.
    /// Every failure path ends in a report, never a propagated error.
    fn publish(&self, event: &EventData, record: Record) {
        self.diagnostics.notice(&event.raw_json());

        let mut guard = match self.transport.lock() {
            Ok(guard) => guard,
            // A panic on some other logging thread must not silence this one.
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.is_none() {
            match self.connector.connect() {
                Ok(transport) => *guard = Some(transport),
                Err(err) => {
                    // Leave the slot unset; the next publish re-attempts connection.
                    self.reporter
                        .report(&format!("tracing-amqp ensure_connected - {}", err));
                    return;
                }
            }
        }
        let transport = match guard.as_mut() {
            Some(transport) => transport,
            None => return,
        };

        let body = match record.to_bytes() {
            Ok(body) => body,
            Err(err) => {
                self.reporter
                    .report(&format!("tracing-amqp serialize - {}", err));
                return;
            }
        };

        let exchange = if is_blank(&self.config.exchange_name) {
            self.diagnostics
                .notice("ExchangeName was empty, fill with value [Default_ExchangeName]");
            DEFAULT_EXCHANGE_NAME
        } else {
            self.config.exchange_name.as_str()
        };

        if let Err(err) = transport.send(exchange, ROUTING_KEY, &body) {
            // The channel stays as the client left it; a broken one keeps failing until
            // something external forces reconnection.
            self.reporter
                .report(&format!("tracing-amqp basic_publish - {}", err));
        }
    }
}

impl<S, C> tracing_subscriber::layer::Layer<S> for Layer<C>
where
    S: tracing::Subscriber,
    C: Connect + Send + Sync + 'static,
    C::Transport: Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // For events bridged from the `log` crate, normalized_metadata() recovers the original
        // logger name; for native tracing events it returns None & the event's own metadata is
        // used.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let data = EventData::from_event(event, meta);
        let record = Record::build(&data, &self.config, self.diagnostics.as_ref());
        self.publish(&data, record);
    }
}
