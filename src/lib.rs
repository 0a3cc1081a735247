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

//! A [`tracing-subscriber`] [`Layer`] implementation that republishes [`tracing`] [`Event`]s as
//! JSON messages on an AMQP exchange.
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! # Introduction
//!
//! This crate decouples "a log happened" from "someone persisted or displayed it": each event
//! your application emits is turned into a structured JSON record (level, message, logger name,
//! optionally a transcoded stack trace & filtered context properties, and an `ApiName` producer
//! tag) and published to a broker exchange, where any number of downstream consumers can bind
//! queues & drain it independently of the producing process.
//!
//! The translation happens in three steps, each behind its own seam:
//!
//! 1. building the [`Record`] from the event ([`record`] module)
//! 2. serializing the record to UTF-8 JSON bytes
//! 3. sending those bytes through a [`Transport`] to the exchange ([`transport`] module)
//!
//! [`Record`]: crate::record::Record
//! [`Transport`]: crate::transport::Transport
//!
//! The broker connection is created lazily on the first publish attempt & reused for the life of
//! the process; if creation fails, the failure is reported & the next publish tries again.
//!
//! A logging side-channel must never destabilize its host, so the [`Layer`] is strictly
//! fail-soft: connection, serialization & publish failures are rendered into a descriptive line,
//! handed to an injectable [`ErrorReporter`], and swallowed. The event is simply lost for that
//! emission; there is no retry queue & no disk spill.
//!
//! [`Layer`]: crate::layer::Layer
//! [`ErrorReporter`]: crate::report::ErrorReporter
//!
//! # Usage
//!
//! The layer comes with sane defaults (a stock local RabbitMQ, sentinel exchange & producer
//! names). Constructing it opens nothing:
//!
//! ```rust
//! use tracing_amqp::{config::AmqpConfig, layer::Layer};
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! // Lazy: no connection is opened until the first event is published.
//! let subscriber = Registry::default().with(Layer::new(AmqpConfig::default()));
//! ```
//!
//! A more complete producer:
//!
//! ```no_run
//! use tracing_amqp::{config::AmqpConfig, layer::Layer};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::registry::Registry;
//!
//! let config = AmqpConfig::builder()
//!     .host("rabbit.internal".to_string())
//!     .exchange_name("app-logs".to_string())
//!     .api_name("inventory-api".to_string())
//!     .include_all_properties(true)
//!     .property_filter("^request_")
//!     .unwrap()
//!     .build();
//! let subscriber = Registry::default().with(Layer::new(config));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! tracing::error!(request_id = 42, "disk full");
//! ```
//!
//! Consumers bind a queue to the exchange (fan-out semantics: every bound queue receives every
//! message) with the fixed routing key [`ROUTING_KEY`] & decode UTF-8 JSON.
//!
//! [`ROUTING_KEY`]: crate::config::ROUTING_KEY

pub mod config;
pub mod error;
pub mod layer;
pub mod record;
pub mod report;
pub mod transport;
