//! Tracing setup for the `bidscan` binary.
//!
//! `RUST_LOG` controls filtering (default `info`). Setting
//! `BIDSCAN_LOG_FORMAT=json` switches stdout to one JSON object per event.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        std::env::var("BIDSCAN_LOG_FORMAT")
            .map(|value| Self::parse(&value))
            .unwrap_or(Self::Compact)
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().with_target(false).compact()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_json_selects_the_json_formatter() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" json "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Compact);
        assert_eq!(LogFormat::parse(""), LogFormat::Compact);
    }
}
