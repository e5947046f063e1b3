//! Console sink. `job` runs print result variables on stdout, so the console stays silent there
//! unless configured otherwise.

use crate::logging::context::ExecutionContext;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

#[cfg(test)]
use std::sync::{Arc, Mutex};

pub type ConsoleFmtLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, BoxMakeWriter>;

/// Console destination, configured as `logging.console_output` or `STAGEFLOW_CONSOLE_OUTPUT`.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

impl ConsoleOutput {
    const ALL: [ConsoleOutput; 3] = [ConsoleOutput::Stdout, ConsoleOutput::Stderr, ConsoleOutput::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleOutput::Stdout => "stdout",
            ConsoleOutput::Stderr => "stderr",
            ConsoleOutput::None => "none",
        }
    }

    fn writer(self) -> BoxMakeWriter {
        match self {
            ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
            ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
            ConsoleOutput::None => BoxMakeWriter::new(io::sink),
        }
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        ConsoleOutput::ALL
            .into_iter()
            .find(|output| output.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown console output '{}' (stdout, stderr, none)", value))
    }
}

/// An explicit setting wins; otherwise handler runs are silent and local commands log to stderr.
pub fn select_console_output(
    context: ExecutionContext,
    configured: Option<ConsoleOutput>,
) -> ConsoleOutput {
    configured.unwrap_or(if context.disables_console() {
        ConsoleOutput::None
    } else {
        ConsoleOutput::Stderr
    })
}

pub fn console_layer<S>(output: ConsoleOutput) -> ConsoleFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    #[cfg(test)]
    let writer = capture::writer().unwrap_or_else(|| output.writer());
    #[cfg(not(test))]
    let writer = output.writer();

    tracing_fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
}


#[cfg(test)]
pub fn set_test_output(buffer: Arc<Mutex<Vec<u8>>>) {
    capture::install(buffer);
}

#[cfg(test)]
pub fn clear_test_output() {
    capture::remove();
}
