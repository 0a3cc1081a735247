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

//! Demo producer: publish a few events to a RabbitMQ broker on localhost.

use tracing::{error, info, warn};
use tracing_amqp::{config::AmqpConfig, layer::Layer};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let config = AmqpConfig::builder()
        .emit_stack_trace_when_available(true)
        .include_all_properties(true)
        .build();

    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::new(config));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    info!("starting up");
    warn!(disk_free_mb = 12, "running low on space");
    error!(exception = "This is an exception trace", "Error Message");

    println!("Press ENTER to exit");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
