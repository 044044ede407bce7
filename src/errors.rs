use crate::services::{AdminError, NotificationLevel, ServiceResult, ViewContext};
use tracing::{error, warn};

pub fn user_message(err: &AdminError) -> String {
    match err {
        AdminError::MissingAuth => "You are not signed in. Please log in again.".into(),
        AdminError::Unauthorized => "Your session has expired. Please log in again.".into(),
        AdminError::Transport(_) => "Could not reach the server. Please try again.".into(),
        AdminError::EmptyOrMalformedPayload(_) => "The server returned no usable data.".into(),
        AdminError::RequestFailed { status, message } => {
            format!("Loading failed ({status}): {message}")
        }
        AdminError::MutationRejected { status, message } => {
            format!("Action failed ({status}): {message}")
        }
        AdminError::Validation(message) => message.clone(),
        AdminError::NotFound(what) => format!("{what} was not found."),
    }
}

pub fn requires_login(err: &AdminError) -> bool {
    matches!(err, AdminError::MissingAuth | AdminError::Unauthorized)
}

/// Records `err` as a user-visible notification and hands it back.
pub fn report_error<T>(ctx: &mut ViewContext, err: AdminError) -> ServiceResult<T> {
    if requires_login(&err) {
        warn!(error = %err, "re-authentication required");
        ctx.context.set("login_required", true);
    } else {
        error!(error = %err, "admin view error");
    }
    let message = user_message(&err);
    ctx.context.set("error_message", &message);
    ctx.notify(NotificationLevel::Error, message);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_error_sets_message() {
        let mut ctx = ViewContext::default();
        let result: ServiceResult<()> = report_error(
            &mut ctx,
            AdminError::MutationRejected {
                status: 409,
                message: "already blocked".into(),
            },
        );
        assert!(result.is_err());
        assert_eq!(
            ctx.context.string("error_message").unwrap(),
            "Action failed (409): already blocked"
        );
        assert!(ctx.has_errors());
        assert!(!ctx.context.bool("login_required"));
    }

    #[test]
    fn auth_errors_ask_for_login() {
        let mut ctx = ViewContext::default();
        let _ = report_error::<()>(&mut ctx, AdminError::Unauthorized);
        assert!(ctx.context.bool("login_required"));
    }
}
