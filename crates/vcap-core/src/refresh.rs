//! One capability refresh: fetch → parse → per-model parse → aggregate.
//!
//! Failure policy:
//! - The capability document failing to load or parse aborts the refresh;
//!   no snapshot is produced.
//! - A model's feature document failing to load or parse only affects that
//!   model (see [`AggregateOptions::unavailable`]); the failure is reported in
//!   [`RefreshReport::failures`].
//!
//! [`AggregateOptions::unavailable`]: crate::aggregate::AggregateOptions

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::aggregate::CapabilityAggregator;
use crate::domcaps::{parse_capabilities, parse_feature_policy, CapabilityDocument, ParseError};
use crate::snapshot::CapabilitySnapshot;
use crate::source::{DocumentSource, SourceError};

/// Errors that abort a refresh.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("capability document unavailable: {0}")]
    Source(#[from] SourceError),

    #[error("capability document from {origin} is malformed: {error}")]
    Parse {
        origin: String,
        #[source]
        error: ParseError,
    },
}

impl From<RefreshError> for vcap_common::Error {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Source(source) => vcap_common::Error::DocumentUnavailable {
                document: source.document().to_string(),
                reason: source.to_string(),
            },
            RefreshError::Parse { origin, error } => vcap_common::Error::MalformedDocument {
                document: origin,
                reason: error.to_string(),
            },
        }
    }
}

/// A usable model whose feature data could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelFailure {
    pub model: String,
    pub reason: String,
}

/// Outcome of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// The new snapshot.
    pub snapshot: CapabilitySnapshot,

    /// The parsed capability document the snapshot was built from.
    pub capabilities: CapabilityDocument,

    /// Usable models that were considered, in document order.
    pub candidates: Vec<String>,

    /// Per-model feature failures.
    pub failures: Vec<ModelFailure>,
}

impl RefreshReport {
    /// True when some usable model lacked feature data.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fetch and parse the capability document only.
pub fn load_capabilities<S>(source: &S) -> Result<CapabilityDocument, RefreshError>
where
    S: DocumentSource + ?Sized,
{
    let raw = source.capabilities()?;
    parse_capabilities(&raw).map_err(|error| RefreshError::Parse {
        origin: source.describe(),
        error,
    })
}

/// Run one refresh against `source`.
pub fn refresh<S>(
    source: &S,
    aggregator: &CapabilityAggregator,
) -> Result<RefreshReport, RefreshError>
where
    S: DocumentSource + ?Sized,
{
    let span = info_span!("refresh", source = %source.describe());
    let _enter = span.enter();

    let capabilities = load_capabilities(source)?;
    let candidates: Vec<String> = aggregator
        .candidate_models(&capabilities)
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut features = HashMap::new();
    let mut failures = Vec::new();

    for model in &candidates {
        let parsed = source
            .feature_policy(model)
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_feature_policy(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(doc) => {
                debug!(model = %model, features = doc.features.len(), "loaded feature document");
                features.insert(model.clone(), doc);
            }
            Err(reason) => {
                warn!(model = %model, reason = %reason, "feature document unavailable");
                failures.push(ModelFailure {
                    model: model.clone(),
                    reason,
                });
            }
        }
    }

    let snapshot = aggregator.aggregate(&capabilities, &features);
    info!(
        models = snapshot.models().len(),
        baseline = snapshot.supported_features().len(),
        degraded = failures.len(),
        "refresh complete"
    );

    Ok(RefreshReport {
        snapshot,
        capabilities,
        candidates,
        failures,
    })
}
