use crate::confirm::Confirm;
use crate::pipeline::{
    CompanionSource, EnrichReport, EnrichmentPipeline, MutationOutcome, MutationRequest,
    PipelineConfig,
};
use crate::services::{BackendService, Method, Record, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::views::{load_into, mutate_into, render_into, FanOut, ViewKind};
use serde_json::Value;

/// Block and verification status copied from `/user/all` onto profile lists.
pub const ACCOUNT_STATUS: CompanionSource = CompanionSource {
    endpoint: "/user/all",
    key_field: "_id",
    fields: &["isBlocked", "isVerified", "email"],
};

pub fn account_config() -> PipelineConfig {
    PipelineConfig::new("/user/all")
}

pub fn block_request(id: &str, blocked: bool) -> MutationRequest {
    let mut patch = Record::new();
    patch.insert("isBlocked".into(), Value::Bool(blocked));
    let prompt = if blocked {
        format!("Block account {id}?")
    } else {
        format!("Unblock account {id}?")
    };
    MutationRequest {
        id: id.to_string(),
        method: Method::Put,
        path: format!("/admin/users/{id}/block?isBlocked={blocked}"),
        prompt,
        patch,
    }
}

pub fn block_action(blocked: bool) -> &'static str {
    if blocked {
        "block"
    } else {
        "unblock"
    }
}

pub struct AccountDirectory<B: BackendService> {
    pipeline: EnrichmentPipeline<B>,
}

impl<B: BackendService> AccountDirectory<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(backend, account_config()),
        }
    }

    pub fn pipeline(&self) -> &EnrichmentPipeline<B> {
        &self.pipeline
    }

    pub async fn load(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
    ) -> ServiceResult<EnrichReport> {
        load_into(
            &mut self.pipeline,
            ctx,
            session,
            ViewKind::Accounts,
            FanOut::Barrier,
        )
        .await
    }

    pub fn render(&self, ctx: &mut ViewContext, query: &str) {
        render_into(&self.pipeline, ctx, ViewKind::Accounts, query);
    }

    pub fn blocked_count(&self) -> usize {
        self.pipeline
            .records()
            .iter()
            .filter(|record| record.get("isBlocked").and_then(Value::as_bool) == Some(true))
            .count()
    }

    pub async fn set_blocked(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
        blocked: bool,
    ) -> ServiceResult<MutationOutcome> {
        mutate_into(
            &mut self.pipeline,
            ctx,
            session,
            confirm,
            ViewKind::Accounts,
            block_action(blocked),
            block_request(id, blocked),
        )
        .await
    }
}
