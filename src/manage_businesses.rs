use crate::confirm::Confirm;
use crate::manage_accounts::{block_action, block_request, ACCOUNT_STATUS};
use crate::pipeline::{EnrichReport, EnrichmentPipeline, MutationOutcome, PipelineConfig};
use crate::services::{BackendService, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::sources::{SourceTable, BUSINESS_REPRESENTATIVE_SOURCE};
use crate::views::{load_into, mutate_into, render_into, FanOut, ViewKind};

pub fn business_config() -> PipelineConfig {
    PipelineConfig::new("/business/all")
        .with_id_fields(&["userId", "_id"])
        .with_discriminator("role", Some("business"))
        .with_display_name_fields(&["businessName", "companyName", "name"])
        .with_resolver(SourceTable::marketplace())
        .with_extra(BUSINESS_REPRESENTATIVE_SOURCE)
        .with_companion(ACCOUNT_STATUS)
}

pub struct BusinessManager<B: BackendService> {
    pipeline: EnrichmentPipeline<B>,
}

impl<B: BackendService> BusinessManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(backend, business_config()),
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
            ViewKind::Businesses,
            FanOut::Streaming,
        )
        .await
    }

    pub fn render(&self, ctx: &mut ViewContext, query: &str) {
        render_into(&self.pipeline, ctx, ViewKind::Businesses, query);
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
            ViewKind::Businesses,
            block_action(blocked),
            block_request(user_id, blocked),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AdminError, BackendResponse, InMemoryBackend, Method};
    use crate::session::MemorySession;
    use serde_json::json;

    #[tokio::test]
    async fn business_gets_detail_and_representative() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut businesses = BusinessManager::new(backend);
        businesses.load(&mut ctx, &session).await.unwrap();

        let list = ctx.context.list("business_list");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["businessName"], "Acme Studio");
        assert_eq!(list[0]["address"], "12 Le Loi, HCMC");
        assert_eq!(
            list[0]["representative"],
            json!({ "fullName": "Quang Vo", "position": "CEO" })
        );
        assert_eq!(list[0]["isVerified"], false);
    }

    #[tokio::test]
    async fn unauthorized_business_list_clears_session() {
        let backend = InMemoryBackend::new_with_sample();
        backend.respond(
            Method::Get,
            "/business/all",
            BackendResponse::new(401, json!({ "message": "jwt expired" })),
        );
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut businesses = BusinessManager::new(backend.clone());
        let err = businesses.load(&mut ctx, &session).await.unwrap_err();
        assert_eq!(err, AdminError::Unauthorized);
        assert!(!session.is_active());
        assert!(ctx.context.bool("login_required"));
        assert!(businesses.pipeline().is_empty());
        assert_eq!(
            backend.request_count(Method::Get, "/business/get-business-by-user-id/u-200"),
            0
        );
    }

    #[tokio::test]
    async fn declined_unblock_changes_nothing() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut businesses = BusinessManager::new(backend.clone());
        businesses.load(&mut ctx, &session).await.unwrap();
        let sent_before = backend.requests().len();

        let outcome = businesses
            .set_blocked(&mut ctx, &session, &|_: &str| false, "u-200", false)
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Declined);
        assert_eq!(backend.requests().len(), sent_before);
        assert!(ctx.actions.is_empty());
    }

    #[tokio::test]
    async fn refresh_reuses_resolved_detail() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut businesses = BusinessManager::new(backend.clone());
        businesses.load(&mut ctx, &session).await.unwrap();
        let report = businesses.load(&mut ctx, &session).await.unwrap();
        assert_eq!(report.requested, 0);
        assert_eq!(
            backend.request_count(Method::Get, "/business/get-business-by-user-id/u-200"),
            1
        );
        assert_eq!(backend.request_count(Method::Get, "/business/all"), 2);
    }
}
