//! Syntax highlighting to inline `<KIND>...</KIND>` markup.
//!
//! This is the front door over [`lumen_scan`]: pick a scanner by language
//! code (or let the registry guess one), run it, and get markup back. It
//! never fails. When a scanner errors, the source comes back escaped and,
//! if asked, wrapped in a failure tag.
//!
//! ```text
//! let registry = lumen::default_registry();
//! let markup = lumen::highlight(registry, "js", "var x = 1;", &HighlightOptions::default());
//! ```

use std::borrow::Cow;
use std::sync::{Once, OnceLock};

use lumen_scan_core::markup::escape;
use tracing::{debug, warn};

pub use lumen_scan::{Kind, Language, Scan, ScanError, ScannerRegistry, SourceInfo};
pub use lumen_scan_core::normalize_newlines;

static TRACING_INIT: Once = Once::new();

/// Install a `RUST_LOG`-filtered subscriber, once per process.
///
/// Does nothing when `RUST_LOG` is unset.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Registry with every reference grammar, built on first use.
pub fn default_registry() -> &'static ScannerRegistry {
    static REGISTRY: OnceLock<ScannerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ScannerRegistry::with_defaults)
}

/// Per-request settings for [`highlight`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Tag wrapped around the escaped source when scanning fails.
    pub failure_tag: Option<String>,
    /// Turn `\r\n` and lone `\r` into `\n` before scanning.
    pub normalize_newlines: bool,
    /// Guess the language when the requested code is unknown.
    pub auto_detect: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        HighlightOptions {
            failure_tag: None,
            normalize_newlines: true,
            auto_detect: false,
        }
    }
}

/// Highlight `src` as language `code`.
///
/// An unknown code falls back to a guess (with `auto_detect`) and then to
/// the registry default. Any scanner error yields the escaped source.
#[tracing::instrument(level = "debug", skip_all, fields(code = %code))]
pub fn highlight(registry: &ScannerRegistry, code: &str, src: &str, options: &HighlightOptions) -> String {
    let src = if options.normalize_newlines {
        normalize_newlines(src)
    } else {
        Cow::Borrowed(src)
    };
    let result = resolve(registry, code, &src, options).and_then(|mut scanner| scanner.highlight(&src));
    match result {
        Ok(markup) => markup,
        Err(err) => {
            warn!(%err, code, "highlighting failed, returning plain source");
            failure(&src, options)
        }
    }
}

/// Most likely language code for `src`, or `None` when nothing matches and
/// the registry has no default.
pub fn guess_language(registry: &ScannerRegistry, src: &str) -> Option<&'static str> {
    registry.guess(src).map(|(code, _)| code)
}

fn resolve(
    registry: &ScannerRegistry,
    code: &str,
    src: &str,
    options: &HighlightOptions,
) -> Result<Box<dyn Scan>, ScanError> {
    match registry.get(code) {
        Err(ScanError::UnknownLanguage { .. }) => {
            if options.auto_detect {
                if let Some(guessed) = guess_language(registry, src) {
                    debug!(code, guessed, "unknown language, using guess");
                    return registry.get(guessed);
                }
            }
            debug!(code, "unknown language, using default");
            registry.get_default()
        }
        other => other,
    }
}

fn failure(src: &str, options: &HighlightOptions) -> String {
    let escaped = escape(src);
    match &options.failure_tag {
        Some(tag) => format!("<{tag}>{escaped}</{tag}>"),
        None => escaped,
    }
}

#[cfg(test)]
mod tests;
