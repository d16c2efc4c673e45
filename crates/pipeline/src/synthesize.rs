//! Answer synthesis: the convergence point of every branch.

use crate::capabilities::AnswerGenerator;
use crate::state::PipelineState;
use quarry_prompt::NO_CONTEXT_PLACEHOLDER;
use std::time::Duration;

/// Run the synthesis stage.
///
/// A previously recorded branch error short-circuits into an apology that
/// embeds the error text; no capability call is made on a known-failed
/// branch. Otherwise the generator is called with the gathered context (or
/// the no-context placeholder), and its own failure is converted into
/// failure text. `state.answer` is non-empty on every path.
pub async fn synthesize_stage(
    state: &mut PipelineState,
    generator: &dyn AnswerGenerator,
    default_model: &str,
    call_timeout: Duration,
) {
    if let Some(error) = &state.error {
        state.answer = format!(
            "I'm sorry, I couldn't complete this request: {}",
            error
        );
        return;
    }

    let model = state
        .config
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string());

    let context = if state.context.trim().is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        state.context.as_str()
    };

    tracing::info!("Synthesizing answer with model '{}'", model);

    let outcome = tokio::time::timeout(
        call_timeout,
        generator.generate(&state.question, context, &model),
    )
    .await;

    state.answer = match outcome {
        Ok(Ok(answer)) if !answer.trim().is_empty() => answer,
        Ok(Ok(_)) => "The language model returned an empty response.".to_string(),
        Ok(Err(e)) => format!("Failed to generate an answer: {}", e),
        Err(_) => format!(
            "Answer generation timed out after {}s",
            call_timeout.as_secs()
        ),
    };
}
