use crate::error::Error;
use act_zero::ActorError;
use tracing::error;

/// Error hook for long running actors; logs the failure and keeps the actor alive.
pub fn handle_error(error: ActorError) -> bool {
    match error.downcast_ref::<Error>() {
        Some(e) => error!(
            stop_actor = false,
            "ActorError: {} SpanTrace: {}",
            e,
            e.span_trace()
        ),
        None => error!(stop_actor = false, "ActorError: {:?}", error),
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform;

    #[test]
    fn test_evaluation_errors_keep_actor_alive() {
        let error: Error = platform::Error::Unavailable("rate limited".into()).into();

        assert!(!handle_error(Box::new(error)));
    }

    #[test]
    fn test_foreign_errors_keep_actor_alive() {
        assert!(!handle_error("Terminate".into()));
    }
}
