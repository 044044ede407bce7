use crate::services::{ActionLogEntry, ViewContext};
use chrono::Utc;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

pub fn log_action(ctx: &mut ViewContext, view: &str, action: &str, details: Value) {
    info!(view, action, details = %details, "admin action");
    ctx.actions.push(ActionLogEntry {
        view: view.into(),
        action: action.into(),
        details,
        timestamp: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_are_recorded_in_order() {
        let mut ctx = ViewContext::default();
        log_action(&mut ctx, "accounts", "block", json!({ "id": "u-1" }));
        log_action(&mut ctx, "accounts", "unblock", json!({ "id": "u-1" }));
        let actions: Vec<_> = ctx.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["block", "unblock"]);
        assert_eq!(ctx.actions[0].details["id"], "u-1");
    }
}
