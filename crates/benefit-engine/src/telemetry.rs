use crate::config::TelemetryConfig;
use std::fmt;
use std::sync::Mutex;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Notable steps of an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ProfileNormalized {
        resolved: usize,
        rejected: usize,
    },
    ProgramEvaluated {
        program_id: String,
        score: u8,
        status: &'static str,
        missing: usize,
    },
    ProgramsRanked {
        evaluated: usize,
        returned: usize,
    },
    AutofillCompleted {
        program_id: String,
        completeness_percent: u8,
        missing_required: usize,
    },
    CatalogueReplaced {
        previous: usize,
        current: usize,
    },
}

impl EngineEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            EngineEvent::ProfileNormalized { .. } => "profile_normalized",
            EngineEvent::ProgramEvaluated { .. } => "program_evaluated",
            EngineEvent::ProgramsRanked { .. } => "programs_ranked",
            EngineEvent::AutofillCompleted { .. } => "autofill_completed",
            EngineEvent::CatalogueReplaced { .. } => "catalogue_replaced",
        }
    }
}

/// Collaborator receiving engine events. Injected into the service rather than looked up.
pub trait EngineTelemetry: Send + Sync {
    fn record(&self, event: EngineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl EngineTelemetry for TracingTelemetry {
    fn record(&self, event: EngineEvent) {
        match event {
            EngineEvent::ProfileNormalized { resolved, rejected } => {
                tracing::debug!(resolved, rejected, "profile normalized");
            }
            EngineEvent::ProgramEvaluated {
                program_id,
                score,
                status,
                missing,
            } => {
                tracing::debug!(program_id = %program_id, score, status, missing, "program evaluated");
            }
            EngineEvent::ProgramsRanked {
                evaluated,
                returned,
            } => {
                tracing::info!(evaluated, returned, "programs ranked");
            }
            EngineEvent::AutofillCompleted {
                program_id,
                completeness_percent,
                missing_required,
            } => {
                tracing::info!(
                    program_id = %program_id,
                    completeness_percent,
                    missing_required,
                    "autofill completed"
                );
            }
            EngineEvent::CatalogueReplaced { previous, current } => {
                tracing::info!(previous, current, "catalogue replaced");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl EngineTelemetry for NoopTelemetry {
    fn record(&self, _event: EngineEvent) {}
}

/// Keeps every event in memory; used to assert on emitted telemetry.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EngineTelemetry for RecordingTelemetry {
    fn record(&self, event: EngineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filters_are_reported() {
        std::env::remove_var("RUST_LOG");
        let error = init(&TelemetryConfig {
            log_level: "benefit_engine=loud".to_string(),
        })
        .expect_err("malformed filter");
        assert!(matches!(error, TelemetryError::EnvFilter { .. }));
    }

    #[test]
    fn recording_telemetry_keeps_event_order() {
        let telemetry = RecordingTelemetry::default();
        telemetry.record(EngineEvent::ProfileNormalized {
            resolved: 3,
            rejected: 0,
        });
        telemetry.record(EngineEvent::ProgramsRanked {
            evaluated: 6,
            returned: 2,
        });

        let names: Vec<&str> = telemetry.events().iter().map(EngineEvent::name).collect();
        assert_eq!(names, ["profile_normalized", "programs_ranked"]);
    }
}
