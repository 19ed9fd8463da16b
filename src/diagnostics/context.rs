use std::fmt;

use chrono::Utc;
use rand::Rng;
use tracing::Span;

use crate::domain::ActivityWindow;

/// Diagnostics scope for one pipeline run
///
/// Created per run and handed to the components doing the run's work, which
/// instrument their futures with `span()`. Nothing here is process-global,
/// so back-to-back runs in one process never share log context.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    window: Option<String>,
    span: Span,
}

impl RunContext {
    pub fn new(window: &ActivityWindow) -> Self {
        let run_id = new_run_id();
        let label = window.label();
        let span = tracing::info_span!("harvest", run = %run_id, window = %label);
        Self {
            run_id,
            window: Some(label),
            span,
        }
    }

    /// Context not tied to a window (ad hoc tools, tests)
    pub fn detached() -> Self {
        Self {
            run_id: new_run_id(),
            window: None,
            span: Span::none(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn window(&self) -> Option<&str> {
        self.window.as_deref()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Span for one token's enrichment, nested in the run span
    pub fn token_span(&self, mint: &str) -> Span {
        tracing::info_span!(parent: &self.span, "token", mint = %mint)
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "run {} ({})", self.run_id, window),
            None => write!(f, "run {}", self.run_id),
        }
    }
}

fn new_run_id() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("{}-{:04x}", Utc::now().format("%Y%m%dT%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_context_carries_window() {
        let window = ActivityWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        let ctx = RunContext::new(&window);
        assert_eq!(ctx.window(), Some("2025-01-20"));
        assert!(ctx.to_string().contains("2025-01-20"));
    }

    #[test]
    fn test_run_ids_are_distinct() {
        let ids: std::collections::HashSet<String> =
            (0..16).map(|_| RunContext::detached().run_id().to_string()).collect();
        assert!(ids.len() > 1);
        assert!(RunContext::detached().window().is_none());
    }
}
