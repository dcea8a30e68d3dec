//! Scripted rewrite service for tests and offline runs.

use crate::service::{RewriteRequest, RewriteResponse, RewriteService};
use redraft_core::{AppError, AppResult};
use std::sync::{Arc, Mutex};

type TransformFn = Arc<dyn Fn(&str) -> AppResult<String> + Send + Sync>;
type CallHook = Arc<dyn Fn(&RewriteRequest) + Send + Sync>;

/// In-process [`RewriteService`] with a scripted transform.
///
/// ```
/// use redraft_rewrite::MockRewriteService;
///
/// let service = MockRewriteService::uppercase().failing_on("w5");
/// assert_eq!(service.call_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockRewriteService {
    transform: TransformFn,
    failing: Vec<String>,
    providers: Option<Vec<String>>,
    hook: Option<CallHook>,
    calls: Arc<Mutex<Vec<RewriteRequest>>>,
}

impl MockRewriteService {
    /// Answer every request with `transform(text)`.
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&str) -> AppResult<String> + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
            failing: Vec::new(),
            providers: None,
            hook: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Upper-case the submitted text.
    pub fn uppercase() -> Self {
        Self::new(|text| Ok(text.to_uppercase()))
    }

    /// Return the submitted text unchanged.
    pub fn echo() -> Self {
        Self::new(|text| Ok(text.to_string()))
    }

    /// Fail with a transform error whenever the submitted text equals `text`.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failing.push(text.into());
        self
    }

    /// Only accept the listed provider identifiers.
    pub fn with_providers(mut self, providers: &[&str]) -> Self {
        self.providers = Some(providers.iter().map(|p| p.to_lowercase()).collect());
        self
    }

    /// Run `hook` at the start of every call, before the transform.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RewriteRequest) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<RewriteRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for MockRewriteService {
    fn default() -> Self {
        Self::echo()
    }
}

#[async_trait::async_trait]
impl RewriteService for MockRewriteService {
    fn supports_provider(&self, provider: &str) -> bool {
        match self.providers {
            Some(ref providers) => providers.contains(&provider.to_lowercase()),
            None => true,
        }
    }

    async fn rewrite(&self, request: &RewriteRequest) -> AppResult<RewriteResponse> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if let Some(ref hook) = self.hook {
            hook(request);
        }

        if self.failing.iter().any(|text| *text == request.text) {
            return Err(AppError::Transform(format!(
                "mock failure for \"{}\"",
                request.text
            )));
        }

        let rewritten_text = (self.transform)(&request.text)?;
        Ok(RewriteResponse { rewritten_text })
    }
}
