//! Candidate generation from the completion capability.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::{debug, info, instrument};

use crate::core::sanitize::strip_code_fences;
use crate::core::state::RunState;
use crate::io::completion::CompletionClient;

const GENERATE_TEMPLATE: &str = include_str!("io/prompts/generate.md");

/// Column schema every candidate must produce, in order.
pub const EXPECTED_COLUMNS: [&str; 5] =
    ["Date", "Description", "Debit Amt", "Credit Amt", "Balance"];

/// Builds prompts and turns completions into candidate source.
pub struct Generator<'a, C: CompletionClient> {
    client: &'a C,
}

impl<'a, C: CompletionClient> Generator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Build the prompt for the current state, call the completion backend,
    /// and store the sanitized candidate in `state.generated_code`. No other
    /// state is touched.
    #[instrument(skip_all, fields(target = %state.target, attempt = state.attempt))]
    pub fn generate(&self, state: &mut RunState) -> Result<()> {
        let prompt = render_prompt(state)?;
        debug!(prompt_bytes = prompt.len(), "prompt rendered");
        let raw = self.client.complete(&prompt)?;
        state.generated_code = strip_code_fences(&raw);
        info!(code_bytes = state.generated_code.len(), "candidate generated");
        Ok(())
    }
}

/// Render the generation prompt. The failure section is only present when a
/// previous round left an error behind, and carries its text verbatim.
fn render_prompt(state: &RunState) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("generate", GENERATE_TEMPLATE)
        .context("register generate template")?;
    let template = env.get_template("generate")?;
    let rendered = template.render(context! {
        target => state.target.as_str(),
        columns => EXPECTED_COLUMNS,
        failure => state.last_error.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    })?;
    Ok(rendered)
}
