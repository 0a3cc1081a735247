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

//! [tracing-amqp](crate) errors

use backtrace::Backtrace;

/// [tracing-amqp](crate) error type
///
/// [tracing-amqp](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of a
/// straightforward enumeration with a few match arms chosen on the basis of what the caller will
/// need to respond. Note that nothing in this crate ever lets one of these escape to the logging
/// call site; they exist to be rendered into the message handed to the error reporter.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// The property-filter pattern failed to compile
    BadFilterPattern {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to open the broker connection or its channel
    Connect {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to send a serialized record to the exchange
    Publish {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to serialize a record to JSON
    Serialize {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadFilterPattern { source, .. } => {
                write!(f, "The property-filter pattern failed to compile: {}", source)
            }
            Error::Connect { source, .. } => {
                write!(f, "While connecting to the broker, got {}", source)
            }
            Error::Publish { source, .. } => {
                write!(f, "While publishing to the exchange, got {}", source)
            }
            Error::Serialize { source, .. } => {
                write!(f, "While serializing a log record, got {}", source)
            }
            _ => write!(f, "Other tracing-amqp error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadFilterPattern { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Connect { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Publish { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Serialize { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            _ => write!(f, "{}", self),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
