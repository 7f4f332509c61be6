//! The default prompt sections.

use super::PromptSection;
use crate::config::LoreSettings;
use crate::request::StoryRequest;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt::Write;

// ============================================================================
// World lore
// ============================================================================

/// World setting and tone context.
pub struct WorldLoreSection {
    enabled: bool,
    tone: String,
    emphasize_corruption: bool,
}

impl WorldLoreSection {
    pub fn new(lore: &LoreSettings) -> Self {
        Self {
            enabled: lore.enable_world_lore,
            tone: lore.tone.clone(),
            emphasize_corruption: lore.emphasize_corruption,
        }
    }

    fn tone_description(tone: &str) -> &'static str {
        match tone {
            "grim_hope" => "Dark and brutal, but with glimmers of hope. Not all is lost.",
            "pure_survival" => "Harsh and unforgiving. Every day is a struggle to survive.",
            "mysterious" => "Strange and unsettling. The world holds dark secrets.",
            "rebuilding" => "Cautiously optimistic. People struggle to rebuild.",
            _ => "Post-apocalyptic survival in a corrupted world.",
        }
    }
}

impl PromptSection for WorldLoreSection {
    fn applies(&self, _request: &StoryRequest) -> bool {
        self.enabled
    }

    fn render(&self, request: &StoryRequest) -> String {
        let mut section = String::new();
        section.push_str("## World Setting: The Emberfall Wastes\n\n");
        section.push_str(
            "**The Withering:** A creeping corruption that unmade civilization. It twists \
             flora, hollows out creatures, and wears at the minds of those who linger near \
             it. Its origin is unknown; many would kill for an answer.\n\n",
        );
        section.push_str(
            "**Civilization:** Scattered holds and caravan posts cling on between the ruins. \
             Factions contest salvage, water, and safe roads. Trust is a currency few can \
             afford.\n\n",
        );
        section.push_str(
            "**Technology:** Pre-Withering relics are prized and dangerous. Working machines, \
             sealed medicine, and old-world weapons change hands at blade point.\n\n",
        );
        if self.emphasize_corruption {
            section.push_str(
                "**Withering Influence:** The corruption is never far. It spreads through \
                 soil, water, and wounds; prolonged exposure changes things, rarely for the \
                 better.\n\n",
            );
        }

        let tone = Self::tone_description(request.tone.as_deref().unwrap_or(&self.tone));
        let _ = writeln!(section, "**Tone:** {tone}\n");
        section
    }

    fn order(&self) -> i32 {
        10
    }
}

// ============================================================================
// Biome context
// ============================================================================

struct BiomeInfo {
    description: &'static str,
    factions: &'static [&'static str],
    hazards: &'static [&'static str],
    atmosphere: &'static str,
}

lazy_static! {
    static ref BIOME_DATA: HashMap<&'static str, BiomeInfo> = {
        let mut data = HashMap::new();
        data.insert(
            "Ashen Flats",
            BiomeInfo {
                description: "A grey expanse of cracked earth and drifting ash",
                factions: &["Roaming Clans", "Salvage Guilds", "Caravan League"],
                hazards: &["Ash storms", "Sinkholes", "Tainted wells"],
                atmosphere: "harsh, unforgiving",
            },
        );
        data.insert(
            "Withered Forest",
            BiomeInfo {
                description: "Twisted trees seep with corruption; hollowed beasts watch from the dark",
                factions: &["Verdant Wardens", "Hollow Cults", "Desperate exiles"],
                hazards: &["Withering spores", "Hollowed wildlife", "Shifting ground"],
                atmosphere: "eerie, oppressive",
            },
        );
        data.insert(
            "Sunken City",
            BiomeInfo {
                description: "Flooded streets and leaning towers, echoes of the old world",
                factions: &["Salvage Guilds", "Deepway Enclaves", "Urban scavengers"],
                hazards: &["Collapsing structures", "Flooded passages", "Claimed territories"],
                atmosphere: "melancholic, tense",
            },
        );
        data.insert(
            "Glasswind Dunes",
            BiomeInfo {
                description: "Dunes of fused glass sand; lightning storms walk the horizon",
                factions: &["Roaming Clans", "Storm chasers", "Lone exiles"],
                hazards: &["Glass storms", "Lightning", "No shelter"],
                atmosphere: "desolate, exposed",
            },
        );
        data.insert(
            "Frozen Reach",
            BiomeInfo {
                description: "Perpetual winter over ice-sheathed ruins, resources buried deep",
                factions: &["Bunker survivors", "Frost nomads", "Ice hunters"],
                hazards: &["Extreme cold", "Thin ice", "Scarcity"],
                atmosphere: "isolating, desperate",
            },
        );
        data.insert(
            "Mirepools",
            BiomeInfo {
                description: "Chemical bogs under heavy mist, strange growths in the shallows",
                factions: &["Mire dwellers", "Hollow Cults", "Reclusive healers"],
                hazards: &["Toxic water", "Poisonous flora", "Poor visibility"],
                atmosphere: "oppressive, dangerous",
            },
        );
        data
    };
}

/// Biome-specific factions, threats, and atmosphere.
pub struct BiomeContextSection;

impl PromptSection for BiomeContextSection {
    fn applies(&self, request: &StoryRequest) -> bool {
        !request.snapshot.biome.is_empty()
    }

    fn render(&self, request: &StoryRequest) -> String {
        let biome = &request.snapshot.biome;
        let mut section = String::new();
        let _ = writeln!(section, "## Biome Context: {biome}\n");

        if let Some(info) = BIOME_DATA.get(biome.as_str()) {
            let _ = writeln!(section, "**Environment:** {}\n", info.description);
            section.push_str("**Local Factions:**\n");
            for faction in info.factions {
                let _ = writeln!(section, "- {faction}");
            }
            section.push('\n');
            section.push_str("**Environmental Hazards:**\n");
            for hazard in info.hazards {
                let _ = writeln!(section, "- {hazard}");
            }
            section.push('\n');
            let _ = writeln!(section, "**Atmosphere:** {}\n", info.atmosphere);
        } else {
            let _ = writeln!(
                section,
                "**Environment:** {biome} - a region marked by the Withering\n"
            );
        }
        section
    }

    fn order(&self) -> i32 {
        20
    }
}

// ============================================================================
// Actor context
// ============================================================================

/// Who the encounter is for and where they stand.
pub struct ActorContextSection;

impl PromptSection for ActorContextSection {
    fn applies(&self, request: &StoryRequest) -> bool {
        !request.snapshot.actor_name.is_empty()
    }

    fn render(&self, request: &StoryRequest) -> String {
        let snapshot = &request.snapshot;
        let mut section = String::new();
        section.push_str("## Actor\n\n");
        let _ = writeln!(section, "**Name:** {}", snapshot.actor_name);
        let _ = writeln!(section, "**Level:** {}", snapshot.level);

        let health_percent = if snapshot.max_health > 0.0 {
            snapshot.health / snapshot.max_health * 100.0
        } else {
            100.0
        };
        let _ = write!(section, "**Health:** {health_percent:.0}%");
        if health_percent < 30.0 {
            section.push_str(" (critically injured)");
        } else if health_percent < 60.0 {
            section.push_str(" (wounded)");
        }
        section.push('\n');

        if !snapshot.equipment.is_empty() {
            section.push_str("**Equipment:**\n");
            for (slot, item) in &snapshot.equipment {
                let _ = writeln!(section, "- {slot}: {item}");
            }
        }
        if !snapshot.notable_items.is_empty() {
            let _ = writeln!(
                section,
                "**Notable Items:** {}",
                snapshot.notable_items.join(", ")
            );
        }

        let (x, y, z) = snapshot.position;
        match &snapshot.named_location {
            Some(location) => {
                let _ = writeln!(section, "**Location:** {location} ({x}, {y}, {z})");
            }
            None => {
                let _ = writeln!(section, "**Location:** ({x}, {y}, {z})");
            }
        }
        let _ = writeln!(
            section,
            "**Time:** {}, Weather: {}",
            snapshot.time_of_day, snapshot.weather
        );

        if !snapshot.nearby_actors.is_empty() {
            let _ = writeln!(
                section,
                "**Nearby Travelers:** {}",
                snapshot.nearby_actors.join(", ")
            );
        }
        section.push('\n');
        section
    }

    fn order(&self) -> i32 {
        30
    }
}

// ============================================================================
// Story history
// ============================================================================

/// Journey summary, recent encounters, and active arcs.
pub struct StoryHistorySection;

impl PromptSection for StoryHistorySection {
    fn applies(&self, request: &StoryRequest) -> bool {
        request.narrative_summary.is_some()
            || !request.recent_encounters.is_empty()
            || !request.active_threads.is_empty()
    }

    fn render(&self, request: &StoryRequest) -> String {
        let mut section = String::new();
        section.push_str("## Actor's Story\n\n");

        if let Some(ref summary) = request.narrative_summary {
            let _ = writeln!(section, "{summary}\n");
        }

        if !request.recent_encounters.is_empty() {
            section.push_str("**Recent Encounters:**\n");
            for encounter in request.recent_encounters.iter().take(5) {
                let _ = writeln!(
                    section,
                    "- [{}] {} (Outcome: {})",
                    encounter.kind, encounter.description, encounter.outcome
                );
            }
            section.push('\n');
        }

        if !request.active_threads.is_empty() {
            section.push_str("**Active Story Threads:**\n");
            for thread in &request.active_threads {
                let _ = writeln!(
                    section,
                    "- **{}** (Progress: {}/10, Priority: {:?})",
                    thread.title,
                    thread.progress(),
                    thread.priority
                );
                let _ = writeln!(section, "  {}", thread.description);
                if !thread.narrative_context.is_empty() {
                    let _ = writeln!(section, "  Context: {}", thread.narrative_context);
                }
            }
            section.push('\n');
        }

        if !request.traits.is_empty() {
            section.push_str("**Known Traits:**\n");
            for (name, value) in &request.traits {
                let _ = writeln!(section, "- {name}: {value}");
            }
            section.push('\n');
        }
        section
    }

    fn order(&self) -> i32 {
        40
    }
}

// ============================================================================
// Faction reputation
// ============================================================================

/// Reputation label for a numeric standing.
pub fn reputation_label(reputation: i32) -> &'static str {
    if reputation >= 75 {
        "Revered"
    } else if reputation >= 50 {
        "Honored"
    } else if reputation >= 25 {
        "Friendly"
    } else if reputation >= 0 {
        "Neutral"
    } else if reputation >= -25 {
        "Unfriendly"
    } else if reputation >= -50 {
        "Hostile"
    } else {
        "Hated"
    }
}

/// Faction standings and how NPCs should react to them.
pub struct ReputationSection;

impl PromptSection for ReputationSection {
    fn render(&self, request: &StoryRequest) -> String {
        let mut section = String::new();
        section.push_str("## Faction Relations\n\n");

        if !request.faction_reputation.is_empty() {
            section.push_str("**Actor's Faction Standing:**\n");
            for (faction, reputation) in &request.faction_reputation {
                let _ = writeln!(
                    section,
                    "- {faction}: {} ({reputation})",
                    reputation_label(*reputation)
                );
            }
            section.push('\n');
        }

        section.push_str("**Faction-Based Encounters:**\n");
        section.push_str("- Feature NPCs and creatures from the local factions\n");
        section.push_str("- NPCs react according to the actor's standing with their faction\n");
        section.push_str("- Hostile factions may attack on sight; friendly ones may offer aid or trade\n\n");

        section.push_str("**DO NOT:**\n");
        section.push_str("- Invent buildings, camps, or structures to explore\n");
        section.push_str("- Reference named places that do not exist\n\n");

        section.push_str("**DO:**\n");
        section.push_str("- Use the existing terrain and biome as the backdrop\n");
        section.push_str("- Build encounters around patrols, scouts, traders, or lone wanderers\n\n");
        section
    }

    fn order(&self) -> i32 {
        45
    }
}

// ============================================================================
// Difficulty
// ============================================================================

/// Challenge rating and balance guidance.
pub struct DifficultySection;

impl DifficultySection {
    fn describe(difficulty: f32) -> &'static str {
        if difficulty < 0.2 {
            "Very Easy"
        } else if difficulty < 0.4 {
            "Easy"
        } else if difficulty < 0.6 {
            "Moderate"
        } else if difficulty < 0.8 {
            "Hard"
        } else {
            "Very Hard"
        }
    }
}

impl PromptSection for DifficultySection {
    fn render(&self, request: &StoryRequest) -> String {
        let difficulty = request.difficulty();
        let mut section = String::new();
        section.push_str("## Encounter Difficulty\n\n");
        let _ = writeln!(
            section,
            "**Local Difficulty:** {difficulty:.2} ({})",
            Self::describe(difficulty)
        );
        let _ = writeln!(section, "**Actor Level:** {}\n", request.snapshot.level);

        section.push_str("**Balance Guidelines:**\n");
        if difficulty < 0.3 {
            section.push_str("- Lean easier: trade, information, or 1-2 weak entities\n");
            section.push_str("- Favor narrative and world-building over threat\n");
        } else if difficulty < 0.6 {
            section.push_str("- Balanced challenge for the actor's level\n");
            section.push_str("- 2-3 moderate entities, possibly with mixed hostility\n");
            section.push_str("- Offer tactical options and meaningful choices\n");
        } else {
            section.push_str("- Significant danger: 3-5 entities or strong enemies\n");
            section.push_str("- The actor should feel pressured but not hopeless\n");
        }

        if let Some(kind) = request.preferred_kind {
            let _ = writeln!(section, "\n**Encounter Type:** {kind}");
        }
        section.push('\n');
        section
    }

    fn order(&self) -> i32 {
        50
    }
}

// ============================================================================
// Focus thread
// ============================================================================

/// The thread this cycle must advance.
pub struct FocusThreadSection;

impl PromptSection for FocusThreadSection {
    fn applies(&self, request: &StoryRequest) -> bool {
        request.focus_thread.is_some()
    }

    fn render(&self, request: &StoryRequest) -> String {
        let Some(ref thread) = request.focus_thread else {
            return String::new();
        };
        let mut section = String::new();
        section.push_str("## Priority Focus\n\n");
        let _ = writeln!(section, "Advance the story thread: **{}**", thread.title);
        let _ = writeln!(section, "Progress: {}/10", thread.progress());
        if let Some(ref objective) = thread.current_objective {
            let _ = writeln!(section, "Current objective: {objective}");
        }
        if !thread.narrative_context.is_empty() {
            let _ = writeln!(section, "Current state: {}", thread.narrative_context);
        }
        section.push('\n');
        section
    }

    fn order(&self) -> i32 {
        60
    }
}

// ============================================================================
// Task instructions
// ============================================================================

/// The core generation task and expected response shape.
pub struct TaskInstructionsSection;

impl PromptSection for TaskInstructionsSection {
    fn render(&self, request: &StoryRequest) -> String {
        let mut section = String::new();
        section.push_str("## Your Task:\n\n");

        if request.focus_thread.is_some() {
            section.push_str(
                "Generate a contextually appropriate encounter for this actor. The encounter should:\n\n",
            );
            section.push_str("1. **Fit the Setting** - Match the biome, time, weather, and world lore\n");
            section.push_str("2. **Respect History** - Reference or build upon recent encounters\n");
            section.push_str("3. **Advance the Focus Thread** - Progress the prioritized arc\n");
            section.push_str("4. **Respect Faction Presence** - Only factions appropriate to this biome\n");
            section.push_str("5. **Provide Choices** - Meaningful decisions with consequences\n");
            section.push_str("6. **Create Continuity** - Actions should echo later\n\n");
        } else {
            section.push_str(
                "Generate a fresh, emergent encounter that introduces something new to this \
                 actor's story. This could seed a new story thread, a chance event, or an \
                 unexpected meeting. The encounter should:\n\n",
            );
            section.push_str("1. **Fit the Setting** - Match the biome, time, weather, and world lore\n");
            section.push_str("2. **Respect History** - Avoid repeating recent encounters\n");
            section.push_str("3. **Open Doors** - Leave a hook the story can pick up later\n");
            section.push_str("4. **Provide Choices** - Meaningful decisions with consequences\n\n");
        }

        section.push_str("## Response Format:\n\n");
        section.push_str("Write a creative, immersive encounter narrative in markdown. Include:\n\n");
        section.push_str("- **Title**: A compelling name for the encounter\n");
        section.push_str("- **Type**: combat, exploration, social, trade, or mystery\n");
        section.push_str("- **Setting**: Vivid description of the location and atmosphere\n");
        section.push_str("- **Narrative**: The encounter story with sensory details and tension\n");
        section.push_str("- **Entities**: Creatures/NPCs involved, their appearance and behavior\n");
        section.push_str("- **Dialogue**: Any spoken interactions\n");
        section.push_str("- **Outcomes**: What happens on success, failure, or flight\n\n");
        section.push_str(
            "Be creative and atmospheric. This will be converted to game format in a second step.\n\n",
        );
        section
    }

    fn order(&self) -> i32 {
        90
    }
}
