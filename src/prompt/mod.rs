//! Prompt System - Handlebars rendering of planning prompts

mod planning;
mod render;

pub use planning::{PlanningPrompt, PlanningVars};
pub use render::PromptRenderer;
