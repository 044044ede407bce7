use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(accepted: bool) -> Self {
        if accepted {
            Confirmation::Accepted
        } else {
            Confirmation::Declined
        }
    }
}

/// Yes/no gate asked before any mutating request is sent.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> Confirmation;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> Confirmation {
        Confirmation::from(self(prompt))
    }
}

/// A confirmation decided up front, e.g. from a `confirm=true` query flag.
impl Confirm for Confirmation {
    fn confirm(&self, prompt: &str) -> Confirmation {
        debug!(prompt, answer = ?self, "confirmation preset");
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_receive_the_prompt() {
        let seen = Mutex::new(Vec::new());
        let confirm = |prompt: &str| {
            seen.lock().unwrap().push(prompt.to_string());
            prompt.contains("unblock")
        };
        assert_eq!(confirm.confirm("unblock u-1?"), Confirmation::Accepted);
        assert_eq!(confirm.confirm("block u-1?"), Confirmation::Declined);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn preset_answers_ignore_prompt() {
        assert_eq!(
            Confirmation::from(false).confirm("approve?"),
            Confirmation::Declined
        );
        assert_eq!(
            Confirmation::Accepted.confirm("approve?"),
            Confirmation::Accepted
        );
    }
}
