use crate::confirm::Confirm;
use crate::manage_accounts::{block_action, block_request, ACCOUNT_STATUS};
use crate::pipeline::{EnrichReport, EnrichmentPipeline, MutationOutcome, PipelineConfig};
use crate::services::{BackendService, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::sources::{SourceTable, FREELANCER_FIELDS_SOURCE};
use crate::views::{load_into, mutate_into, render_into, FanOut, ViewKind};

pub fn freelancer_config() -> PipelineConfig {
    PipelineConfig::new("/influ/all")
        .with_id_fields(&["userId", "_id"])
        .with_discriminator("role", Some("freelancer"))
        .with_display_name_fields(&["fullName", "name", "email"])
        .with_resolver(SourceTable::marketplace())
        .with_extra(FREELANCER_FIELDS_SOURCE)
        .with_companion(ACCOUNT_STATUS)
}

/// Freelancer profiles with their account status, profile detail and tags.
pub struct FreelancerManager<B: BackendService> {
    pipeline: EnrichmentPipeline<B>,
}

impl<B: BackendService> FreelancerManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(backend, freelancer_config()),
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
            ViewKind::Freelancers,
            FanOut::Streaming,
        )
        .await
    }

    pub fn render(&self, ctx: &mut ViewContext, query: &str) {
        render_into(&self.pipeline, ctx, ViewKind::Freelancers, query);
    }

    pub async fn set_blocked(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        user_id: &str,
        blocked: bool,
    ) -> ServiceResult<MutationOutcome> {
        mutate_into(
            &mut self.pipeline,
            ctx,
            session,
            confirm,
            ViewKind::Freelancers,
            block_action(blocked),
            block_request(user_id, blocked),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Confirmation;
    use crate::services::{AdminError, BackendResponse, InMemoryBackend, Method};
    use crate::session::MemorySession;
    use serde_json::json;

    #[tokio::test]
    async fn profiles_get_status_detail_and_tags() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut freelancers = FreelancerManager::new(backend);
        let report = freelancers.load(&mut ctx, &session).await.unwrap();
        assert_eq!(report.requested, 4);
        assert_eq!(report.merged, 4);

        let list = ctx.context.list("freelancer_list");
        assert_eq!(list[0]["userId"], "u-100");
        assert_eq!(list[0]["isBlocked"], false);
        assert_eq!(list[0]["city"], "Hanoi");
        assert_eq!(list[0]["fields"], json!([{ "name": "Beauty" }, { "name": "Travel" }]));
        assert_eq!(list[1]["isBlocked"], true);
        assert_eq!(list[1]["fields"], json!([{ "name": "Food" }]));
    }

    #[tokio::test]
    async fn missing_tags_do_not_hide_profile_detail() {
        let backend = InMemoryBackend::new_with_sample();
        backend.break_route(Method::Get, "/field/get-all-field-of-influ/u-100");
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut freelancers = FreelancerManager::new(backend);
        let report = freelancers.load(&mut ctx, &session).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!ctx.has_errors());

        let list = ctx.context.list("freelancer_list");
        assert_eq!(list[0]["city"], "Hanoi");
        assert!(list[0].get("fields").is_none());
    }

    #[tokio::test]
    async fn unauthorized_combined_fetch_clears_session() {
        let backend = InMemoryBackend::new_with_sample();
        backend.respond(
            Method::Get,
            "/user/all",
            BackendResponse::new(401, json!({ "message": "jwt expired" })),
        );
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut freelancers = FreelancerManager::new(backend.clone());
        let err = freelancers.load(&mut ctx, &session).await.unwrap_err();
        assert_eq!(err, AdminError::Unauthorized);
        assert!(!session.is_active());
        assert!(ctx.context.bool("login_required"));
        assert!(freelancers.pipeline().is_empty());
        assert_eq!(
            backend.request_count(Method::Get, "/influ/get-influ-by-userId/u-100"),
            0
        );
    }

    #[tokio::test]
    async fn block_keeps_profile_listed() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut freelancers = FreelancerManager::new(backend);
        freelancers.load(&mut ctx, &session).await.unwrap();
        freelancers
            .set_blocked(&mut ctx, &session, &Confirmation::Accepted, "u-100", true)
            .await
            .unwrap();
        assert_eq!(freelancers.pipeline().len(), 2);
        let list = ctx.context.list("freelancer_list");
        assert_eq!(list[0]["isBlocked"], true);
        assert_eq!(list[0]["city"], "Hanoi");
    }
}
