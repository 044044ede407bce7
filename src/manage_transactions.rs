use crate::confirm::Confirm;
use crate::errors::report_error;
use crate::pipeline::{
    EnrichReport, EnrichmentPipeline, MutationOutcome, MutationRequest, PipelineConfig,
};
use crate::services::{AdminError, BackendService, Method, Record, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::views::{load_into, mutate_into, render_into, FanOut, ViewKind};
use serde_json::Value;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_CANCELLED: &str = "CANCELLED";

pub fn transaction_config() -> PipelineConfig {
    PipelineConfig::new("/transaction/all")
        .with_display_name_fields(&["userName", "fullName", "email"])
}

fn status_of(record: &Record) -> Option<&str> {
    record.get("status").and_then(Value::as_str)
}

fn is_status(record: &Record, status: &str) -> bool {
    status_of(record).is_some_and(|s| s.eq_ignore_ascii_case(status))
}

/// Membership payments. Only pending transactions can be settled.
pub struct TransactionLedger<B: BackendService> {
    pipeline: EnrichmentPipeline<B>,
}

impl<B: BackendService> TransactionLedger<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(backend, transaction_config()),
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
            ViewKind::Transactions,
            FanOut::Barrier,
        )
        .await
    }

    pub fn render(&self, ctx: &mut ViewContext, query: &str) {
        render_into(&self.pipeline, ctx, ViewKind::Transactions, query);
    }

    pub fn pending_count(&self) -> usize {
        self.pipeline
            .records()
            .iter()
            .filter(|record| is_status(record, STATUS_PENDING))
            .count()
    }

    pub fn settled_amount(&self) -> f64 {
        self.pipeline
            .records()
            .iter()
            .filter(|record| is_status(record, STATUS_SUCCESS))
            .filter_map(|record| record.get("amount").and_then(Value::as_f64))
            .fold(0.0, |total, amount| total + amount)
    }

    pub async fn approve(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
    ) -> ServiceResult<MutationOutcome> {
        self.settle(ctx, session, confirm, id, true).await
    }

    pub async fn cancel(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
    ) -> ServiceResult<MutationOutcome> {
        self.settle(ctx, session, confirm, id, false).await
    }

    async fn settle(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
        id: &str,
        approve: bool,
    ) -> ServiceResult<MutationOutcome> {
        let Some(record) = self.pipeline.record(id) else {
            return report_error(ctx, AdminError::NotFound(format!("transaction {id}")));
        };
        if !is_status(record, STATUS_PENDING) {
            let status = status_of(record).unwrap_or("unknown").to_string();
            return report_error(
                ctx,
                AdminError::Validation(format!("transaction {id} is {status}, not pending")),
            );
        }

        let (action, status, prompt) = if approve {
            ("approve", STATUS_SUCCESS, format!("Approve payment {id}?"))
        } else {
            ("cancel", STATUS_CANCELLED, format!("Cancel payment {id}?"))
        };
        let mut patch = Record::new();
        patch.insert("status".into(), Value::String(status.into()));
        let request = MutationRequest {
            id: id.to_string(),
            method: Method::Post,
            path: format!("/transaction/{action}/{id}"),
            prompt,
            patch,
        };
        mutate_into(
            &mut self.pipeline,
            ctx,
            session,
            confirm,
            ViewKind::Transactions,
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
    use crate::services::InMemoryBackend;
    use crate::session::MemorySession;

    async fn loaded() -> (InMemoryBackend, TransactionLedger<InMemoryBackend>, ViewContext) {
        let backend = InMemoryBackend::new_with_sample();
        let mut ctx = ViewContext::default();
        let mut ledger = TransactionLedger::new(backend.clone());
        ledger
            .load(&mut ctx, &MemorySession::with_token("jwt"))
            .await
            .unwrap();
        (backend, ledger, ctx)
    }

    #[tokio::test]
    async fn approve_marks_success_and_keeps_row() {
        let (backend, mut ledger, mut ctx) = loaded().await;
        assert_eq!(ledger.pending_count(), 1);
        assert_eq!(ledger.settled_amount(), 499000.0);

        ledger
            .approve(
                &mut ctx,
                &MemorySession::with_token("jwt"),
                &Confirmation::Accepted,
                "t-1",
            )
            .await
            .unwrap();
        assert_eq!(ledger.pipeline().len(), 2);
        assert_eq!(ledger.pipeline().record("t-1").unwrap()["status"], "SUCCESS");
        assert_eq!(ledger.pending_count(), 0);
        assert_eq!(ledger.settled_amount(), 698000.0);
        assert_eq!(backend.request_count(Method::Post, "/transaction/approve/t-1"), 1);
    }

    #[test]
    fn empty_ledger_settles_to_positive_zero() {
        let ledger = TransactionLedger::new(InMemoryBackend::new());
        let amount = ledger.settled_amount();
        assert_eq!(amount, 0.0);
        assert!(amount.is_sign_positive());
        assert_eq!(serde_json::to_string(&amount).unwrap(), "0.0");
    }

    #[tokio::test]
    async fn settled_transactions_cannot_be_cancelled() {
        let (backend, mut ledger, mut ctx) = loaded().await;
        let err = ledger
            .cancel(
                &mut ctx,
                &MemorySession::with_token("jwt"),
                &Confirmation::Accepted,
                "t-2",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert_eq!(backend.request_count(Method::Post, "/transaction/cancel/t-2"), 0);
        assert!(ctx.has_errors());
    }

    #[tokio::test]
    async fn cancel_marks_cancelled() {
        let (_, mut ledger, mut ctx) = loaded().await;
        ledger
            .cancel(
                &mut ctx,
                &MemorySession::with_token("jwt"),
                &Confirmation::Accepted,
                "t-1",
            )
            .await
            .unwrap();
        let list = ctx.context.list("transaction_list");
        assert_eq!(list[0]["status"], "CANCELLED");
    }
}
