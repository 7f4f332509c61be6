//! Model capability table.
//!
//! Per-model request constraints live here as data, not as code branches
//! scattered through the clients: whether temperature can be set, whether a
//! system message is allowed, and which token-limit field name the API
//! expects. Families are detected by prefix match on the model id, with the
//! most specific (longest) matching prefix winning, so adding a new model
//! generation is a table entry.

/// A family of models sharing the same request constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// OpenAI o1 reasoning models: no temperature, no system messages,
    /// `max_completion_tokens`.
    O1,
    /// OpenAI GPT-5 models: temperature fixed to the 1.0 default,
    /// `max_completion_tokens`.
    Gpt5,
    /// OpenAI GPT-4o models: full control, `max_completion_tokens`.
    Gpt4o,
    /// OpenAI GPT-4 Turbo models: full control, legacy `max_tokens`.
    Gpt4Turbo,
    /// OpenAI GPT-4 base models.
    Gpt4,
    /// OpenAI GPT-3.5 models.
    Gpt35,
    /// Anthropic Claude models: full control, `max_tokens`.
    Claude,
    /// Anything we don't recognize; conservative defaults apply.
    Unknown,
}

/// How a model family treats the temperature parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureSupport {
    /// Caller-chosen temperature is accepted.
    Full,
    /// Only a single mandated value is accepted; send that constant.
    Fixed(f32),
    /// The parameter must be omitted entirely.
    Unsupported,
}

/// Which field name carries the token limit on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenParam {
    MaxTokens,
    MaxCompletionTokens,
}

impl TokenParam {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenParam::MaxTokens => "max_tokens",
            TokenParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

/// Resolved request constraints for a specific model id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCaps {
    pub family: ModelFamily,
    pub temperature: TemperatureSupport,
    pub system_messages: bool,
    pub token_param: TokenParam,
    pub default_max_tokens: u32,
}

/// Prefix table mapping model ids to families. Longest match wins, so
/// `gpt-4o` resolves ahead of `gpt-4` and `gpt-4-turbo` ahead of both.
const FAMILY_PREFIXES: &[(&str, ModelFamily)] = &[
    ("o1-", ModelFamily::O1),
    ("gpt-5", ModelFamily::Gpt5),
    ("gpt-4o", ModelFamily::Gpt4o),
    ("gpt-4-turbo", ModelFamily::Gpt4Turbo),
    ("gpt-4-1106", ModelFamily::Gpt4Turbo),
    ("gpt-4-0125", ModelFamily::Gpt4Turbo),
    ("gpt-4", ModelFamily::Gpt4),
    ("gpt-3.5", ModelFamily::Gpt35),
    ("claude", ModelFamily::Claude),
];

impl ModelCaps {
    /// Resolve capabilities for a model id.
    pub fn for_model(model_id: &str) -> Self {
        let family = FAMILY_PREFIXES
            .iter()
            .filter(|(prefix, _)| model_id.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, family)| *family)
            .unwrap_or(ModelFamily::Unknown);
        Self::for_family(family)
    }

    /// Capabilities for a known family.
    pub fn for_family(family: ModelFamily) -> Self {
        match family {
            ModelFamily::O1 => Self {
                family,
                temperature: TemperatureSupport::Unsupported,
                system_messages: false,
                token_param: TokenParam::MaxCompletionTokens,
                default_max_tokens: 2000,
            },
            ModelFamily::Gpt5 => Self {
                family,
                temperature: TemperatureSupport::Fixed(1.0),
                system_messages: true,
                token_param: TokenParam::MaxCompletionTokens,
                default_max_tokens: 2000,
            },
            ModelFamily::Gpt4o => Self {
                family,
                temperature: TemperatureSupport::Full,
                system_messages: true,
                token_param: TokenParam::MaxCompletionTokens,
                default_max_tokens: 2000,
            },
            ModelFamily::Gpt4Turbo | ModelFamily::Gpt4 | ModelFamily::Gpt35 => Self {
                family,
                temperature: TemperatureSupport::Full,
                system_messages: true,
                token_param: TokenParam::MaxTokens,
                default_max_tokens: 2000,
            },
            ModelFamily::Claude => Self {
                family,
                temperature: TemperatureSupport::Full,
                system_messages: true,
                token_param: TokenParam::MaxTokens,
                default_max_tokens: 2000,
            },
            // Conservative defaults: keep the system message, omit the
            // temperature, use the legacy token field.
            ModelFamily::Unknown => Self {
                family,
                temperature: TemperatureSupport::Unsupported,
                system_messages: true,
                token_param: TokenParam::MaxTokens,
                default_max_tokens: 2000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_detection() {
        assert_eq!(ModelCaps::for_model("o1-mini").family, ModelFamily::O1);
        assert_eq!(ModelCaps::for_model("gpt-5-turbo").family, ModelFamily::Gpt5);
        assert_eq!(ModelCaps::for_model("gpt-4o-mini").family, ModelFamily::Gpt4o);
        assert_eq!(
            ModelCaps::for_model("gpt-4-turbo-preview").family,
            ModelFamily::Gpt4Turbo
        );
        assert_eq!(
            ModelCaps::for_model("gpt-4-1106-preview").family,
            ModelFamily::Gpt4Turbo
        );
        assert_eq!(ModelCaps::for_model("gpt-4-0613").family, ModelFamily::Gpt4);
        assert_eq!(ModelCaps::for_model("gpt-3.5-turbo").family, ModelFamily::Gpt35);
        assert_eq!(
            ModelCaps::for_model("claude-3-5-sonnet-20241022").family,
            ModelFamily::Claude
        );
        assert_eq!(ModelCaps::for_model("mistral-large").family, ModelFamily::Unknown);
    }

    #[test]
    fn test_most_specific_prefix_wins() {
        // "gpt-4o" shares the "gpt-4" prefix but must resolve to its own family.
        assert_eq!(ModelCaps::for_model("gpt-4o").family, ModelFamily::Gpt4o);
        assert_eq!(
            ModelCaps::for_model("gpt-4-turbo").family,
            ModelFamily::Gpt4Turbo
        );
    }

    #[test]
    fn test_o1_constraints() {
        let caps = ModelCaps::for_model("o1-preview");
        assert_eq!(caps.temperature, TemperatureSupport::Unsupported);
        assert!(!caps.system_messages);
        assert_eq!(caps.token_param, TokenParam::MaxCompletionTokens);
    }

    #[test]
    fn test_gpt5_fixed_temperature() {
        let caps = ModelCaps::for_model("gpt-5");
        assert_eq!(caps.temperature, TemperatureSupport::Fixed(1.0));
        assert!(caps.system_messages);
    }

    #[test]
    fn test_unknown_is_conservative() {
        let caps = ModelCaps::for_model("some-future-model");
        assert_eq!(caps.temperature, TemperatureSupport::Unsupported);
        assert!(caps.system_messages);
        assert_eq!(caps.token_param, TokenParam::MaxTokens);
    }
}
