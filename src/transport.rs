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

//! The broker transport layer.
//!
//! This module defines the [`Transport`] trait the publisher sends through, the [`Connect`] trait
//! the layer uses to create one lazily, and the AMQP implementations of both. Consumers of this
//! crate are free to implement either trait themselves (an in-memory transport for tests, say).
//!
//! # Examples
//!
//! Opening a transport eagerly, outside the layer:
//!
//! ```rust
//! use tracing_amqp::config::AmqpConfig;
//! use tracing_amqp::transport::AmqpTransport;
//!
//! let config = AmqpConfig::builder().host("no-such-host.invalid".to_string()).build();
//! let transport = AmqpTransport::open(&config);
//! assert!(transport.is_err()); // no such broker, after all
//! ```

use crate::config::AmqpConfig;
use crate::error::{Error, Result};

use amiquip::{Channel, Connection, Publish};
use backtrace::Backtrace;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send one serialized record to `exchange` under `routing_key`.
    ///
    /// A blocking call with no timeout: it runs to completion or failure, taking as long as the
    /// network round-trip takes.
    fn send(&mut self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<()>;
}

/// Creates a [`Transport`] on demand.
///
/// The layer holds one of these & calls it lazily: on the first publish attempt, and again on any
/// publish attempt after a failed creation left the channel slot unset.
pub trait Connect {
    type Transport: Transport;
    fn connect(&self) -> Result<Self::Transport>;
}

/// One AMQP connection with one channel multiplexed over it.
///
/// Process-lifetime resource: never explicitly closed by this crate; teardown is host-process
/// exit.
pub struct AmqpTransport {
    // Dropping the connection tears down the channel, so it rides along even though only the
    // channel is ever used after opening.
    _connection: Connection,
    channel: Channel,
}

impl AmqpTransport {
    /// Open a connection to the broker described by `config` & one channel over it.
    pub fn open(config: &AmqpConfig) -> Result<AmqpTransport> {
        let mut connection =
            Connection::insecure_open(&config.uri()).map_err(|err| Error::Connect {
                source: Box::new(err),
                back: Backtrace::new(),
            })?;
        let channel = connection.open_channel(None).map_err(|err| Error::Connect {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        Ok(AmqpTransport {
            _connection: connection,
            channel,
        })
    }
}

impl Transport for AmqpTransport {
    fn send(&mut self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<()> {
        self.channel
            .basic_publish(exchange, Publish::new(body, routing_key))
            .map_err(|err| Error::Publish {
                source: Box::new(err),
                back: Backtrace::new(),
            })
    }
}

/// The [`Connect`] implementation for AMQP: holds the broker coordinates & opens an
/// [`AmqpTransport`] each time the layer asks for one.
pub struct AmqpConnector {
    config: AmqpConfig,
}

impl AmqpConnector {
    pub fn new(config: AmqpConfig) -> AmqpConnector {
        AmqpConnector { config }
    }
}

impl Connect for AmqpConnector {
    type Transport = AmqpTransport;
    fn connect(&self) -> Result<AmqpTransport> {
        AmqpTransport::open(&self.config)
    }
}
