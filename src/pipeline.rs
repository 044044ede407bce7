//! Generic fetch → enrich → render pipeline shared by every admin view.
//!
//! A pipeline owns one primary list and one [`MergeTable`] per secondary
//! source. Secondary fetches are gated by absence from the table, so a
//! refresh of the primary list only fetches detail for ids it has not seen.

use crate::confirm::{Confirm, Confirmation};
use crate::filter::filter_by_display_name;
use crate::merge_table::MergeTable;
use crate::payload::{error_message, normalize_list, unwrap_data};
use crate::services::{
    AdminError, BackendResponse, BackendService, Method, Record, ServiceResult,
};
use crate::session::{require_token, SessionStore};
use crate::sources::{EndpointTemplate, MergeStrategy, SecondarySource, SourceTable};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationPolicy {
    /// The record leaves the list once the backend accepts the action.
    RemoveOnSuccess,
    /// The record stays and the patch is shallow-merged into it.
    PatchInPlace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOutcome {
    Applied,
    Declined,
}

/// A second list fetched together with the primary one; selected fields of
/// the matching entry are copied onto each primary record.
#[derive(Clone, Debug)]
pub struct CompanionSource {
    pub endpoint: &'static str,
    pub key_field: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub primary_endpoint: String,
    pub id_fields: Vec<&'static str>,
    pub discriminator_field: &'static str,
    pub default_discriminator: Option<&'static str>,
    pub display_name_fields: Vec<&'static str>,
    pub resolver: SourceTable,
    pub extras: Vec<SecondarySource>,
    pub companion: Option<CompanionSource>,
    pub mutation_policy: MutationPolicy,
}

impl PipelineConfig {
    pub fn new(primary_endpoint: impl Into<String>) -> Self {
        Self {
            primary_endpoint: primary_endpoint.into(),
            id_fields: vec!["_id", "id"],
            discriminator_field: "role",
            default_discriminator: None,
            display_name_fields: vec!["name", "fullName", "email"],
            resolver: SourceTable::new(),
            extras: Vec::new(),
            companion: None,
            mutation_policy: MutationPolicy::PatchInPlace,
        }
    }

    pub fn with_id_fields(mut self, fields: &[&'static str]) -> Self {
        self.id_fields = fields.to_vec();
        self
    }

    pub fn with_discriminator(
        mut self,
        field: &'static str,
        default: Option<&'static str>,
    ) -> Self {
        self.discriminator_field = field;
        self.default_discriminator = default;
        self
    }

    pub fn with_display_name_fields(mut self, fields: &[&'static str]) -> Self {
        self.display_name_fields = fields.to_vec();
        self
    }

    pub fn with_resolver(mut self, resolver: SourceTable) -> Self {
        self.resolver = resolver;
        self
    }

    /// Adds a source that applies to every record regardless of its
    /// discriminator.
    pub fn with_extra(mut self, source: SecondarySource) -> Self {
        self.extras.push(source);
        self
    }

    pub fn with_companion(mut self, companion: CompanionSource) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn with_mutation_policy(mut self, policy: MutationPolicy) -> Self {
        self.mutation_policy = policy;
        self
    }
}

#[derive(Clone, Debug)]
pub struct MutationRequest {
    pub id: String,
    pub method: Method,
    pub path: String,
    pub prompt: String,
    pub patch: Record,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub requested: usize,
    pub merged: usize,
    pub failed: usize,
    pub discarded: usize,
}

type SecondaryResult = (SecondarySource, String, ServiceResult<Value>);

pub struct EnrichmentPipeline<B: BackendService> {
    backend: B,
    config: PipelineConfig,
    records: Vec<Record>,
    tables: HashMap<&'static str, MergeTable>,
}

impl<B: BackendService> EnrichmentPipeline<B> {
    pub fn new(backend: B, config: PipelineConfig) -> Self {
        Self {
            backend,
            config,
            records: Vec::new(),
            tables: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|record| self.record_id(record).as_deref() == Some(id))
    }

    pub fn table(&self, source: &str) -> Option<&MergeTable> {
        self.tables.get(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_id(&self, record: &Record) -> Option<String> {
        record_id_of(&self.config.id_fields, record)
    }

    pub fn discriminator(&self, record: &Record) -> Option<String> {
        record
            .get(self.config.discriminator_field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.config.default_discriminator.map(str::to_string))
    }

    pub fn resolve_secondary_source(&self, discriminator: &str) -> Option<EndpointTemplate> {
        self.config.resolver.resolve_secondary_source(discriminator)
    }

    /// The role-selected detail source (at most one) followed by the extras.
    fn sources_for(&self, record: &Record) -> Vec<SecondarySource> {
        let mut sources = Vec::with_capacity(1 + self.config.extras.len());
        if let Some(discriminator) = self.discriminator(record) {
            if let Some(source) = self.config.resolver.resolve(&discriminator) {
                sources.push(*source);
            }
        }
        sources.extend(self.config.extras.iter().copied());
        sources
    }

    #[instrument(name = "pipeline_fetch_primary", skip(self, token), fields(endpoint = %self.config.primary_endpoint))]
    pub async fn fetch_primary(&self, token: &str) -> ServiceResult<Vec<Record>> {
        let response = self
            .backend
            .get(&self.config.primary_endpoint, token)
            .await?;
        check_read(&response)?;
        Ok(self.collect_records(normalize_list(&response.body)))
    }

    /// Fetches the primary list (and its companion, when configured) and
    /// installs it. Nothing is touched when the fetch fails.
    pub async fn load_primary(&mut self, session: &dyn SessionStore) -> ServiceResult<usize> {
        let token = require_token(session)?;
        let records = match &self.config.companion {
            Some(companion) => self.fetch_combined(companion, &token, session).await?,
            None => self.fetch_primary(&token).await?,
        };
        let count = records.len();
        self.install(records);
        info!(
            endpoint = %self.config.primary_endpoint,
            count,
            "primary list loaded"
        );
        Ok(count)
    }

    async fn fetch_combined(
        &self,
        companion: &CompanionSource,
        token: &str,
        session: &dyn SessionStore,
    ) -> ServiceResult<Vec<Record>> {
        let (primary, secondary) = tokio::join!(
            self.fetch_primary(token),
            self.backend.get(companion.endpoint, token)
        );
        let unauthorized = matches!(primary, Err(AdminError::Unauthorized))
            || matches!(&secondary, Ok(response) if response.is_unauthorized());
        if unauthorized {
            warn!(
                endpoint = %self.config.primary_endpoint,
                companion = companion.endpoint,
                "backend rejected the session; clearing it"
            );
            session.clear();
            return Err(AdminError::Unauthorized);
        }

        let mut records = primary?;
        let secondary = secondary?;
        check_read(&secondary)?;
        let lookup: HashMap<String, Record> = normalize_list(&secondary.body)
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(entry) => {
                    record_id_of(&[companion.key_field], &entry).map(|id| (id, entry))
                }
                _ => None,
            })
            .collect();
        for record in &mut records {
            let Some(id) = record_id_of(&self.config.id_fields, record) else {
                continue;
            };
            if let Some(entry) = lookup.get(&id) {
                for field in companion.fields {
                    if let Some(value) = entry.get(*field) {
                        record.insert((*field).to_string(), value.clone());
                    }
                }
            }
        }
        Ok(records)
    }

    fn collect_records(&self, items: Vec<Value>) -> Vec<Record> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) if self.record_id(&record).is_some() => Some(record),
                other => {
                    warn!(
                        endpoint = %self.config.primary_endpoint,
                        item = %other,
                        "skipping list entry without an id"
                    );
                    None
                }
            })
            .collect()
    }

    /// Replaces the primary list. Secondary entries survive for ids that
    /// are still listed and are dropped for the rest.
    pub fn install(&mut self, records: Vec<Record>) {
        self.records = records;
        let live = live_ids(&self.config.id_fields, &self.records);
        for table in self.tables.values_mut() {
            table.retain_ids(&live);
        }
    }

    fn pending(&self) -> Vec<(SecondarySource, String)> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for record in &self.records {
            let Some(id) = self.record_id(record) else {
                continue;
            };
            for source in self.sources_for(record) {
                let loaded = self
                    .tables
                    .get(source.name)
                    .is_some_and(|table| table.contains(&id));
                if !loaded && seen.insert((source.name, id.clone())) {
                    pending.push((source, id.clone()));
                }
            }
        }
        pending
    }

    pub async fn load_secondary(
        &self,
        source: &SecondarySource,
        id: &str,
        session: &dyn SessionStore,
    ) -> ServiceResult<Value> {
        let token = require_token(session)?;
        fetch_secondary(&self.backend, source, id, &token).await
    }

    /// Fans out every missing secondary fetch, waits for all of them, then
    /// merges the successes.
    pub async fn enrich_all(&mut self, session: &dyn SessionStore) -> ServiceResult<EnrichReport> {
        let token = require_token(session)?;
        let pending = self.pending();
        let mut report = EnrichReport {
            requested: pending.len(),
            ..EnrichReport::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        let backend = &self.backend;
        let token = token.as_str();
        let results: Vec<SecondaryResult> = join_all(
            pending
                .into_iter()
                .map(|(source, id)| fetch_tagged(backend, source, id, token)),
        )
        .await;

        let live = live_ids(&self.config.id_fields, &self.records);
        for (source, id, result) in results {
            accept_secondary(&mut self.tables, &live, &mut report, source, id, result);
        }
        debug!(?report, "secondary fan-out joined");
        Ok(report)
    }

    /// Like [`enrich_all`](Self::enrich_all) but merges each result as soon
    /// as it resolves, in completion order.
    pub async fn enrich_streaming(
        &mut self,
        session: &dyn SessionStore,
    ) -> ServiceResult<EnrichReport> {
        let token = require_token(session)?;
        let pending = self.pending();
        let mut report = EnrichReport {
            requested: pending.len(),
            ..EnrichReport::default()
        };

        let Self {
            backend,
            config,
            records,
            tables,
        } = self;
        let backend: &B = backend;
        let live = live_ids(&config.id_fields, records);
        let token = token.as_str();
        let mut in_flight: FuturesUnordered<_> = pending
            .into_iter()
            .map(|(source, id)| fetch_tagged(backend, source, id, token))
            .collect();
        while let Some((source, id, result)) = in_flight.next().await {
            accept_secondary(tables, &live, &mut report, source, id, result);
        }
        Ok(report)
    }

    /// Stores a secondary record delivered for `id`. Writes for ids that are
    /// no longer in the primary list are discarded.
    pub fn merge_into(&mut self, source: &'static str, id: &str, record: Value) -> bool {
        if self.record(id).is_none() {
            debug!(source, id, "discarding secondary record for unlisted id");
            return false;
        }
        self.tables
            .entry(source)
            .or_default()
            .merge_into(id, record);
        true
    }

    /// Folds a successful mutation into local state according to the view's
    /// policy. Returns whether a record matched.
    pub fn apply_mutation(&mut self, id: &str, patch: &Record) -> bool {
        let Some(position) = self
            .records
            .iter()
            .position(|record| self.record_id(record).as_deref() == Some(id))
        else {
            return false;
        };
        match self.config.mutation_policy {
            MutationPolicy::RemoveOnSuccess => {
                self.records.remove(position);
                for table in self.tables.values_mut() {
                    table.remove(id);
                }
            }
            MutationPolicy::PatchInPlace => {
                let record = &mut self.records[position];
                for (key, value) in patch {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        true
    }

    /// Confirm, send, then patch. A declined confirmation sends nothing; a
    /// rejected request leaves local state as it was.
    #[instrument(name = "pipeline_mutate", skip(self, session, confirm, request), fields(id = %request.id, path = %request.path))]
    pub async fn mutate(
        &mut self,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        request: MutationRequest,
    ) -> ServiceResult<MutationOutcome> {
        if self.record(&request.id).is_none() {
            return Err(AdminError::NotFound(request.id));
        }
        if confirm.confirm(&request.prompt) == Confirmation::Declined {
            info!("mutation declined");
            return Ok(MutationOutcome::Declined);
        }
        let token = require_token(session)?;
        let response = self
            .backend
            .send(request.method, &request.path, &token)
            .await?;
        if !response.is_success() {
            let message = error_message(&response.body)
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            warn!(status = response.status, %message, "mutation rejected");
            return Err(AdminError::MutationRejected {
                status: response.status,
                message,
            });
        }
        self.apply_mutation(&request.id, &request.patch);
        Ok(MutationOutcome::Applied)
    }

    pub fn render(&self) -> Vec<Value> {
        self.records
            .iter()
            .map(|record| self.render_record(record))
            .collect()
    }

    pub fn render_filtered(&self, query: &str) -> Vec<Value> {
        filter_by_display_name(&self.render(), &self.config.display_name_fields, query)
    }

    fn render_record(&self, record: &Record) -> Value {
        let mut rendered = record.clone();
        let Some(id) = self.record_id(record) else {
            return Value::Object(rendered);
        };
        for source in self.sources_for(record) {
            let Some(secondary) = self.tables.get(source.name).and_then(|t| t.get(&id)) else {
                continue;
            };
            match (source.strategy, secondary) {
                (MergeStrategy::Flatten, Value::Object(fields)) => {
                    for (key, value) in fields {
                        rendered
                            .entry(key.clone())
                            .or_insert_with(|| value.clone());
                    }
                }
                (MergeStrategy::Flatten, other) => {
                    rendered.insert(source.name.to_string(), other.clone());
                }
                (MergeStrategy::Nest(field), value) => {
                    rendered.insert(field.to_string(), value.clone());
                }
            }
        }
        Value::Object(rendered)
    }
}

pub fn record_id_of(fields: &[&str], record: &Record) -> Option<String> {
    fields.iter().find_map(|field| match record.get(*field) {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

fn live_ids(fields: &[&str], records: &[Record]) -> HashSet<String> {
    records
        .iter()
        .filter_map(|record| record_id_of(fields, record))
        .collect()
}

fn check_read(response: &BackendResponse) -> ServiceResult<()> {
    if response.is_unauthorized() {
        return Err(AdminError::Unauthorized);
    }
    if !response.is_success() {
        return Err(AdminError::RequestFailed {
            status: response.status,
            message: error_message(&response.body)
                .unwrap_or_else(|| format!("HTTP {}", response.status)),
        });
    }
    Ok(())
}

async fn fetch_secondary<B: BackendService>(
    backend: &B,
    source: &SecondarySource,
    id: &str,
    token: &str,
) -> ServiceResult<Value> {
    let response = backend.get(&source.template.expand(id), token).await?;
    if !response.is_success() {
        return Err(AdminError::RequestFailed {
            status: response.status,
            message: error_message(&response.body)
                .unwrap_or_else(|| format!("HTTP {}", response.status)),
        });
    }
    match unwrap_data(response.body) {
        Value::Null => Err(AdminError::EmptyOrMalformedPayload(format!(
            "{} returned no record for {id}",
            source.name
        ))),
        record => Ok(record),
    }
}

async fn fetch_tagged<B: BackendService>(
    backend: &B,
    source: SecondarySource,
    id: String,
    token: &str,
) -> SecondaryResult {
    let result = fetch_secondary(backend, &source, &id, token).await;
    (source, id, result)
}

fn accept_secondary(
    tables: &mut HashMap<&'static str, MergeTable>,
    live: &HashSet<String>,
    report: &mut EnrichReport,
    source: SecondarySource,
    id: String,
    result: ServiceResult<Value>,
) {
    match result {
        Ok(record) if live.contains(&id) => {
            tables.entry(source.name).or_default().merge_into(&id, record);
            report.merged += 1;
        }
        Ok(_) => {
            debug!(source = source.name, id = %id, "late secondary record discarded");
            report.discarded += 1;
        }
        Err(err) => {
            warn!(source = source.name, id = %id, error = %err, "secondary fetch failed; skipping");
            report.failed += 1;
        }
    }
}
