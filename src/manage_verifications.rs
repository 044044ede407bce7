use crate::confirm::Confirm;
use crate::pipeline::{
    EnrichReport, EnrichmentPipeline, MutationOutcome, MutationPolicy, MutationRequest,
    PipelineConfig,
};
use crate::services::{BackendService, Method, Record, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::sources::SourceTable;
use crate::views::{load_into, mutate_into, render_into, FanOut, ViewKind};
use serde_json::Value;

pub fn verification_config() -> PipelineConfig {
    PipelineConfig::new("/user/unverified")
        .with_resolver(SourceTable::marketplace())
        .with_mutation_policy(MutationPolicy::RemoveOnSuccess)
}

/// Accounts waiting for an admin decision. Approved and rejected accounts
/// leave the queue.
pub struct VerificationQueue<B: BackendService> {
    pipeline: EnrichmentPipeline<B>,
}

impl<B: BackendService> VerificationQueue<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(backend, verification_config()),
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
            ViewKind::Verifications,
            FanOut::Barrier,
        )
        .await
    }

    pub fn render(&self, ctx: &mut ViewContext, query: &str) {
        render_into(&self.pipeline, ctx, ViewKind::Verifications, query);
    }

    pub async fn approve(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
    ) -> ServiceResult<MutationOutcome> {
        self.decide(ctx, session, confirm, id, true).await
    }

    pub async fn reject(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
    ) -> ServiceResult<MutationOutcome> {
        self.decide(ctx, session, confirm, id, false).await
    }

    async fn decide(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
        verified: bool,
    ) -> ServiceResult<MutationOutcome> {
        let (action, prompt) = if verified {
            ("approve", format!("Approve account {id}?"))
        } else {
            ("reject", format!("Reject account {id}?"))
        };
        let mut patch = Record::new();
        patch.insert("isVerified".into(), Value::Bool(verified));
        let request = MutationRequest {
            id: id.to_string(),
            method: Method::Put,
            path: format!("/admin/users/{id}/verify-account?isVerified={verified}"),
            prompt,
            patch,
        };
        mutate_into(
            &mut self.pipeline,
            ctx,
            session,
            confirm,
            ViewKind::Verifications,
            action,
            request,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Confirmation;
    use crate::services::{BackendResponse, InMemoryBackend};
    use crate::session::MemorySession;
    use serde_json::json;

    #[tokio::test]
    async fn queue_renders_with_role_detail() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut queue = VerificationQueue::new(backend);
        let report = queue.load(&mut ctx, &session).await.unwrap();
        assert_eq!(report.merged, 2);

        let list = ctx.context.list("verification_list");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["follower"], 12800);
        assert_eq!(list[1]["taxCode"], "0312345678");
    }

    #[tokio::test]
    async fn approve_removes_from_queue() {
        let backend = InMemoryBackend::new_with_sample();
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut queue = VerificationQueue::new(backend.clone());
        queue.load(&mut ctx, &session).await.unwrap();

        let outcome = queue
            .approve(&mut ctx, &session, &Confirmation::Accepted, "u-100")
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert!(queue.pipeline().record("u-100").is_none());
        assert_eq!(ctx.context.list("verification_list").len(), 1);
        assert_eq!(
            backend.request_count(Method::Put, "/admin/users/u-100/verify-account?isVerified=true"),
            1
        );
        assert_eq!(ctx.actions[0].action, "approve");
    }

    #[tokio::test]
    async fn rejected_decision_keeps_record_and_notifies() {
        let backend = InMemoryBackend::new_with_sample();
        backend.respond(
            Method::Put,
            "/admin/users/u-200/verify-account?isVerified=false",
            BackendResponse::new(403, json!({ "message": "forbidden" })),
        );
        let session = MemorySession::with_token("jwt");
        let mut ctx = ViewContext::default();
        let mut queue = VerificationQueue::new(backend);
        queue.load(&mut ctx, &session).await.unwrap();

        let err = queue
            .reject(&mut ctx, &session, &Confirmation::Accepted, "u-200")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::services::AdminError::MutationRejected { status: 403, .. }));
        assert!(queue.pipeline().record("u-200").is_some());
        assert!(ctx.has_errors());
    }

    #[tokio::test]
    async fn missing_token_surfaces_message() {
        let backend = InMemoryBackend::new_with_sample();
        let mut ctx = ViewContext::default();
        let mut queue = VerificationQueue::new(backend.clone());
        assert!(queue
            .load(&mut ctx, &MemorySession::default())
            .await
            .is_err());
        assert!(ctx.context.bool("login_required"));
        assert!(backend.requests().is_empty());
    }
}
