//! Named analyses, dispatched through an enumerated kind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::analyzers::descriptive::{
    self, AnalysisContext, HourlyActivity, LocationFrequency, PriorityDistribution,
    TransportDuration, TransportTypes,
};
use crate::error::EngineError;

/// Keyword parameters forwarded verbatim from the caller. Each analysis reads
/// the keys it understands and ignores the rest.
pub type AnalysisParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    HourlyActivity,
    TransportTypes,
    LocationFrequency,
    TransportDuration,
    PriorityAnalysis,
}

impl AnalysisKind {
    /// Registration order.
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::HourlyActivity,
        AnalysisKind::TransportTypes,
        AnalysisKind::LocationFrequency,
        AnalysisKind::TransportDuration,
        AnalysisKind::PriorityAnalysis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::HourlyActivity => "hourly_activity",
            AnalysisKind::TransportTypes => "transport_types",
            AnalysisKind::LocationFrequency => "location_frequency",
            AnalysisKind::TransportDuration => "transport_duration",
            AnalysisKind::PriorityAnalysis => "priority_analysis",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| EngineError::UnknownAnalysis(s.to_string()))
    }
}

/// A fully-typed invocation: the kind plus the parameters it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    HourlyActivity {
        date_column: Option<String>,
    },
    TransportTypes {
        type_column: Option<String>,
    },
    LocationFrequency {
        start_column: Option<String>,
        end_column: Option<String>,
    },
    TransportDuration,
    PriorityAnalysis {
        priority_column: Option<String>,
    },
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind, params: &AnalysisParams) -> Self {
        let param = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();
        match kind {
            AnalysisKind::HourlyActivity => AnalysisRequest::HourlyActivity {
                date_column: param("date_column"),
            },
            AnalysisKind::TransportTypes => AnalysisRequest::TransportTypes {
                type_column: param("type_column"),
            },
            AnalysisKind::LocationFrequency => AnalysisRequest::LocationFrequency {
                start_column: param("start_column"),
                end_column: param("end_column"),
            },
            AnalysisKind::TransportDuration => AnalysisRequest::TransportDuration,
            AnalysisKind::PriorityAnalysis => AnalysisRequest::PriorityAnalysis {
                priority_column: param("priority_column"),
            },
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::HourlyActivity { .. } => AnalysisKind::HourlyActivity,
            AnalysisRequest::TransportTypes { .. } => AnalysisKind::TransportTypes,
            AnalysisRequest::LocationFrequency { .. } => AnalysisKind::LocationFrequency,
            AnalysisRequest::TransportDuration => AnalysisKind::TransportDuration,
            AnalysisRequest::PriorityAnalysis { .. } => AnalysisKind::PriorityAnalysis,
        }
    }

    pub fn run(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        match self {
            AnalysisRequest::HourlyActivity { date_column } => AnalysisOutput::HourlyActivity(
                descriptive::hourly_activity(ctx, date_column.as_deref()),
            ),
            AnalysisRequest::TransportTypes { type_column } => AnalysisOutput::TransportTypes(
                descriptive::transport_types(ctx, type_column.as_deref()),
            ),
            AnalysisRequest::LocationFrequency {
                start_column,
                end_column,
            } => AnalysisOutput::LocationFrequency(descriptive::location_frequency(
                ctx,
                start_column.as_deref(),
                end_column.as_deref(),
            )),
            AnalysisRequest::TransportDuration => {
                AnalysisOutput::TransportDuration(descriptive::transport_duration(ctx))
            }
            AnalysisRequest::PriorityAnalysis { priority_column } => {
                AnalysisOutput::PriorityAnalysis(descriptive::priority_distribution(
                    ctx,
                    priority_column.as_deref(),
                ))
            }
        }
    }
}

/// Result of one analysis. Serializes as the inner result only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutput {
    HourlyActivity(HourlyActivity),
    TransportTypes(TransportTypes),
    LocationFrequency(LocationFrequency),
    TransportDuration(TransportDuration),
    PriorityAnalysis(PriorityDistribution),
}

impl AnalysisOutput {
    /// Message set when the analysis degraded to its empty shape.
    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisOutput::HourlyActivity(r) => r.error.as_deref(),
            AnalysisOutput::TransportTypes(r) => r.error.as_deref(),
            AnalysisOutput::LocationFrequency(r) => r.error.as_deref(),
            AnalysisOutput::TransportDuration(r) => r.error.as_deref(),
            AnalysisOutput::PriorityAnalysis(r) => r.error.as_deref(),
        }
    }
}
