//! Intent dispatcher
//!
//! Turns an extracted intent into a live widget and starts its single
//! executor invocation in the background. Executor errors, panics and
//! timeouts all end as a `fail` phase on the widget.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};
use vox_agentic::{LlmClient, LlmResultClassifier, ResultInterpreter};
use vox_intent_types::{ExtractedIntent, Intent};

use crate::config::{ClassifierMode, SessionConfig};
use crate::error::PipelineError;
use crate::executor::{HttpAgentExecutor, IntentExecutor, UnconfiguredExecutor};
use crate::widget::{IntentWidget, WidgetEvent};

pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Dispatcher {
    executor: Arc<dyn IntentExecutor>,
    interpreter: Arc<ResultInterpreter>,
    timeout: Duration,
    runtime: Option<Handle>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn IntentExecutor>, interpreter: Arc<ResultInterpreter>) -> Self {
        Self {
            executor,
            interpreter,
            timeout: DEFAULT_EXECUTOR_TIMEOUT,
            runtime: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run widgets and executor calls on this runtime instead of the
    /// caller's, so `dispatch` also works from synchronous code.
    pub fn on_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the session's collaborators from configuration.
    ///
    /// `llm` is only consulted when `RESULT_CLASSIFIER=llm`.
    pub fn from_config(
        config: &SessionConfig,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Result<Self, PipelineError> {
        let executor: Arc<dyn IntentExecutor> = match &config.executor_url {
            Some(url) => Arc::new(
                HttpAgentExecutor::with_timeout(url.clone(), config.executor_timeout)
                    .map_err(|e| PipelineError::Config(format!("{:#}", e)))?,
            ),
            None => {
                warn!("EXECUTOR_URL not set; intents will fail when dispatched");
                Arc::new(UnconfiguredExecutor)
            }
        };

        let interpreter = match (config.classifier, llm) {
            (ClassifierMode::Llm, Some(client)) => {
                ResultInterpreter::with_classifier(Arc::new(LlmResultClassifier::new(client)))
            }
            (ClassifierMode::Llm, None) => {
                return Err(PipelineError::Config(
                    "RESULT_CLASSIFIER=llm requires an LLM client".to_string(),
                ))
            }
            (ClassifierMode::Heuristic, _) => ResultInterpreter::heuristic(),
        };

        Ok(Self::new(executor, Arc::new(interpreter)).with_timeout(config.executor_timeout))
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Create the widget for an intent and kick off its executor call.
    ///
    /// Returns immediately with the widget in `processing`. Unrecognized
    /// intents get a static fallback widget and are never executed. Each
    /// widget gets its own fork of the interpreter, so remembered results
    /// are dropped with the widget.
    ///
    /// # Panics
    ///
    /// Panics when no runtime was set with [`Self::on_runtime`] and the
    /// caller is not inside a tokio runtime.
    pub fn dispatch(&self, extracted: ExtractedIntent) -> IntentWidget {
        let intent = match extracted {
            ExtractedIntent::Recognized(intent) => intent,
            ExtractedIntent::Unrecognized { raw, reason } => {
                info!(%reason, "Rendering unrecognized intent without execution");
                return IntentWidget::fallback(&raw, reason);
            }
        };

        info!(kind = %intent.kind(), summary = %intent.summary(), "Dispatching intent");
        let runtime = self.runtime.clone().unwrap_or_else(Handle::current);
        let widget = IntentWidget::spawn_on(
            &runtime,
            intent.clone(),
            Arc::new(self.interpreter.fork()),
        );

        if let Some(events) = widget.event_sender() {
            let executor = self.executor.clone();
            let timeout = self.timeout;
            runtime.spawn(async move {
                let outcome = invoke_once(executor, &intent, timeout).await;
                // Widget may already be disposed
                let _ = events.send(WidgetEvent::InvocationFinished(outcome));
            });
        }

        widget
    }
}

async fn invoke_once(
    executor: Arc<dyn IntentExecutor>,
    intent: &Intent,
    timeout: Duration,
) -> Result<String, PipelineError> {
    let payload = intent
        .to_json()
        .map_err(|e| PipelineError::ExecutorInvocation(format!("serialize intent: {}", e)))?;

    let mut call = tokio::spawn(async move { executor.invoke(&payload).await });

    match tokio::time::timeout(timeout, &mut call).await {
        Ok(Ok(Ok(output))) => Ok(output.output),
        Ok(Ok(Err(e))) => Err(PipelineError::ExecutorInvocation(format!("{:#}", e))),
        Ok(Err(join_error)) => Err(PipelineError::ExecutorInvocation(format!(
            "executor task failed: {}",
            join_error
        ))),
        Err(_) => {
            call.abort();
            Err(PipelineError::ExecutorInvocation(format!(
                "timed out after {}s",
                timeout.as_secs_f64()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorOutput;
    use crate::widget::Phase;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vox_intent_types::SwapIntent;

    struct SlowExecutor;

    #[async_trait]
    impl IntentExecutor for SlowExecutor {
        async fn invoke(&self, _serialized_intent: &str) -> Result<ExecutorOutput> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ExecutorOutput::new("Swap successful"))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl IntentExecutor for PanickingExecutor {
        async fn invoke(&self, _serialized_intent: &str) -> Result<ExecutorOutput> {
            panic!("executor blew up");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IntentExecutor for CountingExecutor {
        async fn invoke(&self, serialized_intent: &str) -> Result<ExecutorOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(serialized_intent.contains("\"intent\":\"swap\""));
            Ok(ExecutorOutput::new("Swap completed successfully"))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn swap() -> ExtractedIntent {
        ExtractedIntent::Recognized(Intent::Swap(SwapIntent {
            amount: "10".to_string(),
            from_token: "USDC".to_string(),
            to_token: "ETH".to_string(),
            chain: "base".to_string(),
        }))
    }

    fn heuristic() -> Arc<ResultInterpreter> {
        Arc::new(ResultInterpreter::heuristic())
    }

    #[tokio::test]
    async fn test_dispatch_runs_executor_once() {
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::new(executor.clone(), heuristic());

        let widget = dispatcher.dispatch(swap());
        let snapshot = widget.settled().await;
        assert_eq!(snapshot.phase, Phase::Success);
        assert_eq!(snapshot.transaction_url(), None);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_widget() {
        let dispatcher = Dispatcher::new(Arc::new(SlowExecutor), heuristic())
            .with_timeout(Duration::from_secs(1));
        let widget = dispatcher.dispatch(swap());
        assert_eq!(widget.snapshot().phase, Phase::Processing);

        let snapshot = widget.settled().await;
        assert_eq!(snapshot.phase, Phase::Fail);
        assert!(snapshot.failure.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_panicking_executor_fails_widget() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingExecutor), heuristic());
        let snapshot = dispatcher.dispatch(swap()).settled().await;
        assert_eq!(snapshot.phase, Phase::Fail);
        assert_eq!(snapshot.transaction_url(), None);
    }

    #[tokio::test]
    async fn test_unrecognized_intent_is_not_executed() {
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::new(executor.clone(), heuristic());
        let widget = dispatcher.dispatch(ExtractedIntent::from_value(json!({"intent": "stake"})));

        assert_eq!(widget.snapshot().phase, Phase::Pending);
        tokio::task::yield_now().await;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_from_synchronous_code() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let dispatcher =
            Dispatcher::new(executor.clone(), heuristic()).on_runtime(runtime.handle().clone());

        let widget = dispatcher.dispatch(swap());
        let snapshot = runtime.block_on(widget.settled());
        assert_eq!(snapshot.phase, Phase::Success);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        drop(widget);
    }

    #[test]
    fn test_from_config_requires_llm_for_llm_classifier() {
        let config = SessionConfig {
            classifier: ClassifierMode::Llm,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Dispatcher::from_config(&config, None),
            Err(PipelineError::Config(_))
        ));

        let dispatcher = Dispatcher::from_config(&SessionConfig::default(), None).unwrap();
        assert_eq!(dispatcher.executor_name(), "unconfigured");
    }
}
