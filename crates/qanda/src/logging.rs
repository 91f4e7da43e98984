//! Logging configuration for qanda.
//!
//! Diagnostics go through `tracing` and are written to stderr, so they never
//! interleave with the page rendered on stdout. `RUST_LOG`, when set, replaces
//! the level chosen on the command line.

use std::io::IsTerminal;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// The most detailed level shown.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive for this crate's events when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_directive(&self) -> String {
        format!("qanda={}", self.to_level_filter())
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Colours are only used when stderr is a terminal. Calling this again after
/// a subscriber is installed has no effect.
///
/// # Examples
///
/// ```no_run
/// use qanda::{init_logging, logging::Verbosity};
///
/// // `qanda -v run 2>qanda.log` keeps the page clean and the log complete
/// init_logging(Verbosity::Verbose);
/// tracing::debug!("written to stderr, never to the page");
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let ansi = std::io::stderr().is_terminal();
    let _ = subscriber(verbosity.filter(), std::io::stderr, ansi).try_init();
}

/// Compose the filter with a plain single-line formatter on `writer`.
fn subscriber<W>(
    filter: EnvFilter,
    writer: W,
    ansi: bool,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize logging for tests: warnings and errors, captured per test.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects everything the formatter writes.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(verbosity: Verbosity, emit: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = subscriber(
            EnvFilter::new(verbosity.default_directive()),
            move || writer.clone(),
            false,
        );
        tracing::subscriber::with_default(subscriber, emit);
        captured.text()
    }

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_normal_hides_debug() {
        let text = capture(Verbosity::Normal, || {
            tracing::info!(backend = "memory", "Store opened");
            tracing::debug!("Loaded records");
        });
        assert!(text.contains("Store opened"));
        assert!(text.contains("backend=\"memory\""));
        assert!(!text.contains("Loaded records"));
    }

    #[test]
    fn test_quiet_keeps_errors() {
        let text = capture(Verbosity::Quiet, || {
            tracing::warn!("Event stream interrupted");
            tracing::error!("Database lock poisoned");
        });
        assert!(!text.contains("interrupted"));
        assert!(text.contains("ERROR"));
    }

    #[test]
    fn test_lines_carry_target_without_colour() {
        let text = capture(Verbosity::Verbose, || tracing::debug!("Input closed"));
        assert!(text.contains("qanda::logging::tests"));
        assert!(!text.contains('\u{1b}'));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_other_crates_are_filtered() {
        let text = capture(Verbosity::Trace, || {
            tracing::info!(target: "hyper::proto", "connection opened");
        });
        assert!(text.is_empty());
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
