//! Filter compilation and per-event evaluation.
//!
//! [`compile`] turns a normalized trigger configuration into the executable
//! filter list; [`evaluate_all`] is the hot path, called once per inbound
//! event. Filters are evaluated independently: AND semantics apply within a
//! filter, OR semantics across filters (any match activates the pipeline).
//!
//! [`FilterSet`] is the reload seam: evaluation threads take an `Arc`
//! snapshot of the current list, and a reload swaps the whole `Arc` so
//! readers see the fully-old or fully-new configuration, never a mix.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::compiled::CompiledFilter;
use crate::config::{Diagnostics, TriggerDef};
use crate::events::GerritEvent;
use crate::types::TriggerUuid;

/// Compiles every trigger definition into a filter.
///
/// Definitions compile independently: a malformed pattern drops only its own
/// definition (reported through `diags`), never the batch. Output order
/// follows input order; matching itself is order-independent since any match
/// suffices.
pub fn compile(defs: &[TriggerDef], diags: &mut Diagnostics) -> Vec<CompiledFilter> {
    let filters: Vec<CompiledFilter> = defs
        .iter()
        .enumerate()
        .filter_map(|(index, def)| CompiledFilter::from_def(index, def, diags))
        .collect();
    debug!(
        compiled = filters.len(),
        dropped = defs.len() - filters.len(),
        "compiled trigger filters"
    );
    filters
}

/// The outcome of evaluating an event against a filter list.
#[derive(Debug)]
pub struct Evaluation<'a> {
    matched: Vec<&'a CompiledFilter>,
}

impl<'a> Evaluation<'a> {
    /// True if at least one filter matched: the pipeline should be activated.
    pub fn is_triggered(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Every filter that matched, in configuration order. More than one
    /// definition can legitimately apply to the same event; the caller merges
    /// their uuid/scheme metadata for downstream routing.
    pub fn matched(&self) -> &[&'a CompiledFilter] {
        &self.matched
    }

    /// The uuids of the matched filters, for filters that carry one.
    pub fn matched_uuids(&self) -> impl Iterator<Item = &'a TriggerUuid> + '_ {
        self.matched.iter().filter_map(|f| f.uuid())
    }
}

/// Evaluates an event against every filter at the current time.
pub fn evaluate_all<'a>(filters: &'a [CompiledFilter], event: &GerritEvent) -> Evaluation<'a> {
    evaluate_all_at(filters, event, Utc::now())
}

/// Evaluates an event against every filter, using `now` for approval age
/// predicates. Every filter is tried; there is no cross-filter short-circuit,
/// so one filter's outcome can never mask another's.
pub fn evaluate_all_at<'a>(
    filters: &'a [CompiledFilter],
    event: &GerritEvent,
    now: DateTime<Utc>,
) -> Evaluation<'a> {
    let matched: Vec<&CompiledFilter> = filters
        .iter()
        .filter(|filter| filter.matches_at(event, now))
        .collect();
    debug!(
        event = %event.describe(),
        matched = matched.len(),
        "evaluated trigger filters"
    );
    Evaluation { matched }
}

/// A shared, reloadable filter list.
///
/// Readers take an [`Arc`] snapshot and evaluate against it without holding
/// any lock; [`FilterSet::replace`] swaps the whole list atomically. A filter
/// list is never mutated in place after compilation.
#[derive(Debug, Default)]
pub struct FilterSet {
    inner: RwLock<Arc<Vec<CompiledFilter>>>,
}

impl FilterSet {
    /// Creates a set from an already-compiled filter list.
    pub fn new(filters: Vec<CompiledFilter>) -> Self {
        FilterSet {
            inner: RwLock::new(Arc::new(filters)),
        }
    }

    /// Returns the current filter list. The snapshot stays valid (and
    /// unchanged) even if a reload happens while the caller is still
    /// evaluating against it.
    pub fn snapshot(&self) -> Arc<Vec<CompiledFilter>> {
        // A poisoned lock means a writer panicked mid-swap; the Arc it was
        // replacing is still consistent, so recover the value.
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically replaces the filter list with a freshly compiled one.
    pub fn replace(&self, filters: Vec<CompiledFilter>) {
        let filters = Arc::new(filters);
        match self.inner.write() {
            Ok(mut guard) => *guard = filters,
            Err(poisoned) => *poisoned.into_inner() = filters,
        }
        debug!("trigger filter set replaced");
    }
}
