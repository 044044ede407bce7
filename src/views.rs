use crate::confirm::Confirm;
use crate::errors::report_error;
use crate::logging::log_action;
use crate::pipeline::{EnrichReport, EnrichmentPipeline, MutationOutcome, MutationRequest};
use crate::services::{BackendService, NotificationLevel, ServiceResult, ViewContext};
use crate::session::SessionStore;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Verifications,
    Accounts,
    Freelancers,
    Businesses,
    Transactions,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Verifications,
        ViewKind::Accounts,
        ViewKind::Freelancers,
        ViewKind::Businesses,
        ViewKind::Transactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Verifications => "verifications",
            ViewKind::Accounts => "accounts",
            ViewKind::Freelancers => "freelancers",
            ViewKind::Businesses => "businesses",
            ViewKind::Transactions => "transactions",
        }
    }

    /// Key under which the rendered list is stored in the view context.
    pub fn list_key(&self) -> &'static str {
        match self {
            ViewKind::Verifications => "verification_list",
            ViewKind::Accounts => "account_list",
            ViewKind::Freelancers => "freelancer_list",
            ViewKind::Businesses => "business_list",
            ViewKind::Transactions => "transaction_list",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim().to_lowercase())
            .ok_or_else(|| format!("unknown view {value}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FanOut {
    /// All secondary results are collected before any is merged.
    Barrier,
    /// Each secondary result is merged as soon as it arrives.
    Streaming,
}

pub fn render_into<B: BackendService>(
    pipeline: &EnrichmentPipeline<B>,
    ctx: &mut ViewContext,
    kind: ViewKind,
    query: &str,
) {
    ctx.context.set(kind.list_key(), pipeline.render_filtered(query));
}

/// Primary load, secondary fan-out, render. Failures become notifications
/// and leave the previously loaded list in place.
pub async fn load_into<B: BackendService>(
    pipeline: &mut EnrichmentPipeline<B>,
    ctx: &mut ViewContext,
    session: &dyn SessionStore,
    kind: ViewKind,
    fan_out: FanOut,
) -> ServiceResult<EnrichReport> {
    if let Err(err) = pipeline.load_primary(session).await {
        return report_error(ctx, err);
    }
    let enriched = match fan_out {
        FanOut::Barrier => pipeline.enrich_all(session).await,
        FanOut::Streaming => pipeline.enrich_streaming(session).await,
    };
    let report = match enriched {
        Ok(report) => report,
        Err(err) => return report_error(ctx, err),
    };
    render_into(pipeline, ctx, kind, "");
    Ok(report)
}

/// Runs a confirmed mutation and re-renders the list on success.
pub async fn mutate_into<B: BackendService>(
    pipeline: &mut EnrichmentPipeline<B>,
    ctx: &mut ViewContext,
    session: &dyn SessionStore,
    confirm: &dyn Confirm,
    kind: ViewKind,
    action: &str,
    request: MutationRequest,
) -> ServiceResult<MutationOutcome> {
    let id = request.id.clone();
    match pipeline.mutate(session, confirm, request).await {
        Ok(MutationOutcome::Applied) => {
            log_action(ctx, kind.as_str(), action, json!({ "id": id }));
            ctx.notify(NotificationLevel::Info, format!("{action}: {id} done"));
            render_into(pipeline, ctx, kind, "");
            Ok(MutationOutcome::Applied)
        }
        Ok(MutationOutcome::Declined) => Ok(MutationOutcome::Declined),
        Err(err) => report_error(ctx, err),
    }
}
