use crate::confirm::Confirm;
use crate::errors::report_error;
use crate::manage_accounts::AccountDirectory;
use crate::manage_businesses::BusinessManager;
use crate::manage_freelancers::FreelancerManager;
use crate::manage_transactions::TransactionLedger;
use crate::manage_verifications::VerificationQueue;
use crate::pipeline::{EnrichReport, MutationOutcome};
use crate::services::{AdminError, BackendService, ServiceResult, ViewContext};
use crate::session::SessionStore;
use crate::views::ViewKind;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    Reject,
    Block,
    Unblock,
    Cancel,
}

impl FromStr for AdminAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "approve" => Ok(AdminAction::Approve),
            "reject" => Ok(AdminAction::Reject),
            "block" => Ok(AdminAction::Block),
            "unblock" => Ok(AdminAction::Unblock),
            "cancel" => Ok(AdminAction::Cancel),
            other => Err(format!("unknown action {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub pending_verifications: usize,
    pub accounts: usize,
    pub blocked_accounts: usize,
    pub freelancers: usize,
    pub businesses: usize,
    pub transactions: usize,
    pub pending_transactions: usize,
    pub settled_amount: f64,
}

/// Every admin view over one backend.
pub struct AdminDashboard<B: BackendService + Clone> {
    backend: B,
    pub verifications: VerificationQueue<B>,
    pub accounts: AccountDirectory<B>,
    pub freelancers: FreelancerManager<B>,
    pub businesses: BusinessManager<B>,
    pub transactions: TransactionLedger<B>,
}

impl<B: BackendService + Clone> AdminDashboard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            verifications: VerificationQueue::new(backend.clone()),
            accounts: AccountDirectory::new(backend.clone()),
            freelancers: FreelancerManager::new(backend.clone()),
            businesses: BusinessManager::new(backend.clone()),
            transactions: TransactionLedger::new(backend.clone()),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn load_view(
        &mut self,
        kind: ViewKind,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
    ) -> ServiceResult<EnrichReport> {
        match kind {
            ViewKind::Verifications => self.verifications.load(ctx, session).await,
            ViewKind::Accounts => self.accounts.load(ctx, session).await,
            ViewKind::Freelancers => self.freelancers.load(ctx, session).await,
            ViewKind::Businesses => self.businesses.load(ctx, session).await,
            ViewKind::Transactions => self.transactions.load(ctx, session).await,
        }
    }

    pub fn render_view(&self, kind: ViewKind, ctx: &mut ViewContext, query: &str) {
        match kind {
            ViewKind::Verifications => self.verifications.render(ctx, query),
            ViewKind::Accounts => self.accounts.render(ctx, query),
            ViewKind::Freelancers => self.freelancers.render(ctx, query),
            ViewKind::Businesses => self.businesses.render(ctx, query),
            ViewKind::Transactions => self.transactions.render(ctx, query),
        }
    }

    /// Loads every view concurrently. Views that fail keep their previous
    /// state; an expired session fails the whole refresh.
    pub async fn refresh_all(
        &mut self,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
    ) -> ServiceResult<Vec<(ViewKind, AdminError)>> {
        let mut contexts: [ViewContext; 5] = Default::default();
        let [verifications_ctx, accounts_ctx, freelancers_ctx, businesses_ctx, transactions_ctx] =
            &mut contexts;
        let results = tokio::join!(
            self.verifications.load(verifications_ctx, session),
            self.accounts.load(accounts_ctx, session),
            self.freelancers.load(freelancers_ctx, session),
            self.businesses.load(businesses_ctx, session),
            self.transactions.load(transactions_ctx, session),
        );
        let results = [results.0, results.1, results.2, results.3, results.4];

        for view_ctx in contexts {
            ctx.notifications.extend(view_ctx.notifications);
            ctx.actions.extend(view_ctx.actions);
        }
        let mut failures = Vec::new();
        for (kind, result) in ViewKind::ALL.into_iter().zip(results) {
            self.render_view(kind, ctx, "");
            if let Err(err) = result {
                warn!(view = %kind, error = %err, "view refresh failed");
                failures.push((kind, err));
            }
        }
        let auth_failure = failures
            .iter()
            .map(|(_, err)| err)
            .find(|err| matches!(err, AdminError::MissingAuth))
            .or_else(|| {
                failures
                    .iter()
                    .map(|(_, err)| err)
                    .find(|err| matches!(err, AdminError::Unauthorized))
            })
            .cloned();
        if let Some(err) = auth_failure {
            ctx.context.set("login_required", true);
            return Err(err);
        }
        Ok(failures)
    }

    pub async fn perform(
        &mut self,
        kind: ViewKind,
        action: AdminAction,
        id: &str,
        ctx: &mut ViewContext,
        session: &dyn SessionStore,
        confirm: &dyn Confirm,
    ) -> ServiceResult<MutationOutcome> {
        match (kind, action) {
            (ViewKind::Verifications, AdminAction::Approve) => {
                self.verifications.approve(ctx, session, confirm, id).await
            }
            (ViewKind::Verifications, AdminAction::Reject) => {
                self.verifications.reject(ctx, session, confirm, id).await
            }
            (ViewKind::Accounts, AdminAction::Block | AdminAction::Unblock) => {
                let blocked = action == AdminAction::Block;
                self.accounts
                    .set_blocked(ctx, session, confirm, id, blocked)
                    .await
            }
            (ViewKind::Freelancers, AdminAction::Block | AdminAction::Unblock) => {
                let blocked = action == AdminAction::Block;
                self.freelancers
                    .set_blocked(ctx, session, confirm, id, blocked)
                    .await
            }
            (ViewKind::Businesses, AdminAction::Block | AdminAction::Unblock) => {
                let blocked = action == AdminAction::Block;
                self.businesses
                    .set_blocked(ctx, session, confirm, id, blocked)
                    .await
            }
            (ViewKind::Transactions, AdminAction::Approve) => {
                self.transactions.approve(ctx, session, confirm, id).await
            }
            (ViewKind::Transactions, AdminAction::Cancel) => {
                self.transactions.cancel(ctx, session, confirm, id).await
            }
            (kind, action) => report_error(
                ctx,
                AdminError::Validation(format!("{action:?} is not available on {kind}")),
            ),
        }
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            pending_verifications: self.verifications.pipeline().len(),
            accounts: self.accounts.pipeline().len(),
            blocked_accounts: self.accounts.blocked_count(),
            freelancers: self.freelancers.pipeline().len(),
            businesses: self.businesses.pipeline().len(),
            transactions: self.transactions.pipeline().len(),
            pending_transactions: self.transactions.pending_count(),
            settled_amount: self.transactions.settled_amount(),
        }
    }
}
