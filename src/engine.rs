//! Wiring of the reporting pipeline, and the session that runs it off the
//! caller's thread.
//!
//! A request flows store -> filter -> window -> normalize for the row view,
//! while the weighted averages and the pivot read the filtered records
//! directly. Each stage is a pure function over an immutable record set, so a
//! session can hand the same `Arc`'d records to as many worker threads as it
//! likes. Results are published through [`Latest`], which drops anything
//! produced for a request that has since been superseded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use chrono::NaiveDate;
use log::{debug, info};

use crate::error::{ReportError, Result};
use crate::export::{self, Artifact, ExportRequest};
use crate::filter::{filter, Facets, FilterCriteria};
use crate::models::ExpenseRecord;
use crate::normalize::normalize;
use crate::pivot::{build_pivot, date_label, Pivot};
use crate::settings::Settings;
use crate::stats::{weighted_average, WeightedAverages};
use crate::store::RecordStore;
use crate::window::{aggregate, select, AggregatedRow, WindowMode};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRequest {
    pub criteria: FilterCriteria,
    pub mode: WindowMode,
    pub per_unit: bool,
}

/// Everything a report screen or export needs for one request.
#[derive(Debug, Clone, Default)]
pub struct ReportView {
    /// Window-aggregated and, if requested, per-unit rows.
    pub rows: Vec<AggregatedRow>,
    /// Raw months the window selected, newest first per property.
    pub selected: Vec<ExpenseRecord>,
    /// `selected` as one row per month, per-unit when requested. Feeds the
    /// workbook's property sheets, which list months even in T12 mode.
    pub detail: Vec<AggregatedRow>,
    /// Over every filtered month regardless of window mode.
    pub averages: WeightedAverages,
    pub pivot: Pivot,
    pub filtered_count: usize,
}

pub fn build_view(records: &[ExpenseRecord], facets: &Facets, request: &ReportRequest) -> Result<ReportView> {
    request.criteria.validate(facets)?;
    let filtered = filter(records, &request.criteria);
    let rows = normalize(&aggregate(&filtered, request.mode), request.per_unit);
    let averages = weighted_average(&filtered);
    let selected = select(&filtered, request.mode);
    let pivot = build_pivot(&selected, date_label);
    let detail = normalize(&aggregate(&selected, WindowMode::All), request.per_unit);
    debug!(
        "view: {} filtered, {} rows, {} pivot lines x {} dates",
        filtered.len(),
        rows.len(),
        pivot.rows.len(),
        pivot.dates.len()
    );
    Ok(ReportView {
        rows,
        selected,
        detail,
        averages,
        pivot,
        filtered_count: filtered.len(),
    })
}

/// Window-aggregated rows of a single property, newest first.
pub fn property_detail(
    records: &[ExpenseRecord],
    property_id: i64,
    mode: WindowMode,
    per_unit: bool,
) -> Vec<AggregatedRow> {
    let own: Vec<ExpenseRecord> = records
        .iter()
        .filter(|r| r.property_id() == property_id)
        .cloned()
        .collect();
    normalize(&aggregate(&own, mode), per_unit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Workbook,
    Template,
    Csv,
}

impl ReportView {
    /// Render this view as `kind`. The template is read from the path in
    /// `settings`; a missing template setting is an error.
    pub fn export(&self, kind: ExportKind, settings: &Settings, date: NaiveDate) -> Result<Artifact> {
        let prefix = settings.export_prefix.as_str();
        match kind {
            ExportKind::Workbook => export::serialize(&ExportRequest::Workbook {
                prefix,
                date,
                rows: &self.detail,
                pivot: &self.pivot,
            }),
            ExportKind::Template => {
                let template = settings
                    .template_bytes()?
                    .ok_or_else(|| ReportError::Settings("no template_path configured".into()))?;
                let spec = settings.template();
                let request = ExportRequest::Template {
                    name: prefix,
                    template: &template,
                    spec: &spec,
                    records: &self.selected,
                };
                export::serialize(&request)
            }
            ExportKind::Csv => export::serialize(&ExportRequest::Csv {
                name: prefix,
                rows: &self.rows,
            }),
        }
    }
}

/// Sequence number handed out when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Holds the result of the most recently issued request. A value published
/// under an older ticket than the newest one issued is discarded.
#[derive(Debug)]
pub struct Latest<T> {
    issued: AtomicU64,
    slot: RwLock<Option<(Ticket, Arc<T>)>>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            slot: RwLock::new(None),
        }
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Store `value` if `ticket` is still the newest issued. Returns whether
    /// it was stored.
    pub fn publish(&self, ticket: Ticket, value: Arc<T>) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let newer_stored = slot.as_ref().is_some_and(|(held, _)| *held >= ticket);
        if newer_stored || !self.is_current(ticket) {
            debug!("dropping result of superseded request {}", ticket.0);
            return false;
        }
        *slot = Some((ticket, value));
        true
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, v)| Arc::clone(v))
    }
}

/// One reporting session over a record set fetched once from the store.
#[derive(Clone)]
pub struct ReportSession {
    records: Arc<Vec<ExpenseRecord>>,
    facets: Arc<Facets>,
    views: Arc<Latest<ReportView>>,
    artifacts: Arc<Latest<Artifact>>,
}

impl ReportSession {
    /// Fetch every record. A failed fetch is returned as is and no session is
    /// created.
    pub fn load(store: &dyn RecordStore) -> Result<Self> {
        let records = store.query()?;
        info!("session loaded {} records", records.len());
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ExpenseRecord>) -> Self {
        let facets = Facets::from_records(&records);
        Self {
            records: Arc::new(records),
            facets: Arc::new(facets),
            views: Arc::new(Latest::new()),
            artifacts: Arc::new(Latest::new()),
        }
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    /// Build the view on the calling thread and publish it. The view is
    /// returned even if a newer request has already been issued.
    pub fn run(&self, request: &ReportRequest) -> Result<Arc<ReportView>> {
        let ticket = self.views.issue();
        let view = Arc::new(build_view(&self.records, &self.facets, request)?);
        self.views.publish(ticket, Arc::clone(&view));
        Ok(view)
    }

    /// Build the view on a worker thread. The handle yields `true` when the
    /// result was published, `false` when a newer request overtook it.
    pub fn submit(&self, request: ReportRequest) -> JoinHandle<Result<bool>> {
        let ticket = self.views.issue();
        let records = Arc::clone(&self.records);
        let facets = Arc::clone(&self.facets);
        let views = Arc::clone(&self.views);
        thread::spawn(move || {
            let view = build_view(&records, &facets, &request)?;
            Ok(views.publish(ticket, Arc::new(view)))
        })
    }

    pub fn latest_view(&self) -> Option<Arc<ReportView>> {
        self.views.get()
    }

    /// Render an artifact on a worker thread, under the same last-request-wins
    /// rule as views.
    pub fn submit_export(
        &self,
        view: Arc<ReportView>,
        kind: ExportKind,
        settings: Settings,
        date: NaiveDate,
    ) -> JoinHandle<Result<bool>> {
        let ticket = self.artifacts.issue();
        let artifacts = Arc::clone(&self.artifacts);
        thread::spawn(move || {
            let artifact = view.export(kind, &settings, date)?;
            Ok(artifacts.publish(ticket, Arc::new(artifact)))
        })
    }

    pub fn latest_artifact(&self) -> Option<Arc<Artifact>> {
        self.artifacts.get()
    }
}
