//! Prompt assembly from modular, composable sections.
//!
//! The story prompt (stage one of the generation pipeline) is built from an
//! ordered set of independently-applicable sections; the conversion prompt
//! (stage two) is fixed. Swapping setting decoration or adding context is a
//! section, not a rewrite.

use crate::config::LoreSettings;
use crate::request::StoryRequest;

pub mod sections;

use sections::{
    ActorContextSection, BiomeContextSection, DifficultySection, FocusThreadSection,
    ReputationSection, StoryHistorySection, TaskInstructionsSection, WorldLoreSection,
};

/// Scene-setting system instruction for the narrative stage.
pub const NARRATIVE_SYSTEM: &str = "You are an expert storyteller for the Emberfall wastes, \
a ruined world scarred by the Withering. Generate immersive, atmospheric encounter \
narratives with rich details, tension, and meaningful choices.";

/// System instruction for the conversion stage.
pub const CONVERSION_SYSTEM: &str = "You are a precise data converter. Convert narrative \
text into structured JSON. Return ONLY valid JSON with no additional text or markdown.";

/// A modular section of the story prompt.
pub trait PromptSection: Send + Sync {
    /// Whether this section applies to the given request.
    fn applies(&self, request: &StoryRequest) -> bool {
        let _ = request;
        true
    }

    /// Render the section content.
    fn render(&self, request: &StoryRequest) -> String;

    /// Ordering within the prompt; lower renders earlier.
    fn order(&self) -> i32 {
        100
    }
}

/// Builds prompts from registered sections.
pub struct PromptBuilder {
    sections: Vec<Box<dyn PromptSection>>,
}

impl PromptBuilder {
    /// Create a builder with the default section set.
    pub fn new(lore: &LoreSettings) -> Self {
        let mut builder = Self::empty();
        builder.add_section(Box::new(WorldLoreSection::new(lore)));
        builder.add_section(Box::new(BiomeContextSection));
        builder.add_section(Box::new(ActorContextSection));
        builder.add_section(Box::new(StoryHistorySection));
        builder.add_section(Box::new(ReputationSection));
        builder.add_section(Box::new(DifficultySection));
        builder.add_section(Box::new(FocusThreadSection));
        builder.add_section(Box::new(TaskInstructionsSection));
        builder
    }

    /// Create a builder with no sections registered.
    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Register an additional section.
    pub fn add_section(&mut self, section: Box<dyn PromptSection>) {
        self.sections.push(section);
    }

    /// Build the complete free-form story prompt (stage one).
    ///
    /// A request without a focus thread produces the emergent variant: the
    /// focus section drops out and the task instructions shift to
    /// introducing something new.
    pub fn build_story_prompt(&self, request: &StoryRequest) -> String {
        let mut applicable: Vec<&dyn PromptSection> = self
            .sections
            .iter()
            .filter(|section| section.applies(request))
            .map(|section| section.as_ref())
            .collect();
        applicable.sort_by_key(|section| section.order());

        let mut prompt = String::from("# Generate Encounter\n\n");
        for section in applicable {
            prompt.push_str(&section.render(request));
        }
        prompt
    }

    /// Build the fixed conversion prompt (stage two) around the narrative.
    pub fn build_conversion_prompt(narrative: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str("# Task: Convert Encounter Story to Game JSON\n\n");
        prompt.push_str(
            "Convert the following encounter narrative into structured JSON for the game.\n\n",
        );
        prompt.push_str("## Original Story:\n\n");
        prompt.push_str(narrative);
        prompt.push_str("\n\n");

        prompt.push_str("## Required JSON Structure:\n\n");
        prompt.push_str("Return ONLY valid JSON (no markdown, no explanations) with this structure:\n\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"encounter_json\": \"{...}\",\n");
        prompt.push_str("  \"story_updates\": {...}\n");
        prompt.push_str("}\n\n");

        prompt.push_str("### encounter_json field (must be an ESCAPED JSON string):\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"title\": \"Encounter Title\",\n");
        prompt.push_str("  \"type\": \"combat|exploration|social|trade|mystery\",\n");
        prompt.push_str("  \"description\": \"Brief one-sentence summary\",\n");
        prompt.push_str("  \"narrative_text\": \"Full narrative for the player\",\n");
        prompt.push_str("  \"entities\": [\n");
        prompt.push_str("    {\n");
        prompt.push_str("      \"entity_type\": \"raider|stalker|warden|trader|wanderer|etc\",\n");
        prompt.push_str("      \"name\": \"Custom name\",\n");
        prompt.push_str("      \"count\": 1,\n");
        prompt.push_str("      \"hostile\": true,\n");
        prompt.push_str("      \"health_modifier\": 1.0,\n");
        prompt.push_str("      \"damage_modifier\": 1.0,\n");
        prompt.push_str("      \"equipment\": [\"item1\", \"item2\"]\n");
        prompt.push_str("    }\n");
        prompt.push_str("  ],\n");
        prompt.push_str("  \"dialogue\": [\n");
        prompt.push_str("    {\"speaker\": \"NPC Name\", \"text\": \"What they say\"}\n");
        prompt.push_str("  ],\n");
        prompt.push_str("  \"outcomes\": {\n");
        prompt.push_str("    \"victory_text\": \"Success message\",\n");
        prompt.push_str("    \"defeat_text\": \"Failure message\",\n");
        prompt.push_str("    \"flee_text\": \"Escape message\",\n");
        prompt.push_str("    \"negotiate_text\": \"Parley message\"\n");
        prompt.push_str("  }\n");
        prompt.push_str("}\n\n");

        prompt.push_str("### story_updates field:\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"encounter_summary\": \"One-line summary\",\n");
        prompt.push_str("  \"thread_updates\": [\n");
        prompt.push_str("    {\"thread_id\": \"existing-id\", \"progress_change\": 1,\n");
        prompt.push_str("     \"narrative_update\": \"What changed\"}\n");
        prompt.push_str("  ],\n");
        prompt.push_str("  \"new_threads\": [\n");
        prompt.push_str("    {\"thread_id\": \"new-id\", \"title\": \"...\", \"description\": \"...\",\n");
        prompt.push_str("     \"priority\": \"medium\", \"current_objective\": \"...\"}\n");
        prompt.push_str("  ],\n");
        prompt.push_str("  \"key_choices\": [\"Important decisions made\"]\n");
        prompt.push_str("}\n\n");

        prompt.push_str("CRITICAL:\n");
        prompt.push_str("- encounter_json must be a STRING with escaped quotes (\\\")\n");
        prompt.push_str("- entities must not be empty; every encounter spawns at least one\n");
        prompt.push_str("- thread_updates may only reference existing thread ids\n");
        prompt.push_str("- Return ONLY the JSON, nothing else\n");

        prompt
    }
}
