//! Turns a game snapshot into the status shown on presence backends

use chrono::{DateTime, Utc};

use crate::sampler::Snapshot;

/// Shown when a boss is present but its object name cleans up to nothing
pub const UNKNOWN_BOSS: &str = "Unknown Boss";

/// Small icon used when no other icon rule matches
pub const DEFAULT_ICON: &str = "knight";

/// Suffixes the engine appends to spawned object names
const DECORATION_TOKENS: &[&str] = &["(Clone)"];

/// What the player is currently doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Resting,
    HotSpring,
    StagStation,
    /// Carries the cleaned display name of the first boss
    FightingBoss(String),
    Exploring,
}

/// Everything a backend needs to render the player's presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceStatus {
    pub activity: Activity,
    pub headline: String,
    pub subline: String,
    pub icon_key: &'static str,
    /// Raw scene name, used as the small icon tooltip
    pub icon_text: String,
    pub session_start: DateTime<Utc>,
}

/// Scene-name view used by the rule predicates: lowercased with `_` read as a space
struct Observation<'a> {
    snapshot: &'a Snapshot,
    scene: String,
}

impl<'a> Observation<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            scene: snapshot.scene_name.to_lowercase().replace('_', " "),
        }
    }

    fn scene_contains(&self, needle: &str) -> bool {
        self.scene.contains(needle)
    }

    fn boss_present(&self) -> bool {
        self.snapshot.first_boss().is_some()
    }
}

type Rule<T> = (fn(&Observation) -> bool, T);

type ActivityFor = fn(&Observation) -> Activity;

/// Checked in order, first match wins. Resting deliberately beats everything.
const ACTIVITY_RULES: &[Rule<ActivityFor>] = &[
    (|o| o.snapshot.is_resting, |_| Activity::Resting),
    (|o| o.scene_contains("hot spring"), |_| Activity::HotSpring),
    (|o| o.scene_contains("stag"), |_| Activity::StagStation),
    (|o| o.boss_present(), |o| Activity::FightingBoss(boss_name(o.snapshot))),
];

const ICON_RULES: &[Rule<&'static str>] = &[
    (|o| o.scene_contains("stag"), "stag"),
    (|o| o.scene_contains("bench"), "bench"),
    (|o| o.scene_contains("hot spring"), "hotspring"),
    (|o| o.scene_contains("dream"), "dream"),
    (|o| o.boss_present(), "boss"),
];

fn first_match<T: Copy>(rules: &[Rule<T>], observation: &Observation, fallback: T) -> T {
    rules
        .iter()
        .find(|(predicate, _)| predicate(observation))
        .map(|(_, result)| *result)
        .unwrap_or(fallback)
}

/// Classify a snapshot. Pure: the same inputs always give the same status.
pub fn classify(snapshot: &Snapshot, session_start: DateTime<Utc>) -> PresenceStatus {
    let observation = Observation::new(snapshot);
    let exploring: ActivityFor = |_| Activity::Exploring;
    let activity = first_match(ACTIVITY_RULES, &observation, exploring)(&observation);
    let icon_key = first_match(ICON_RULES, &observation, DEFAULT_ICON);
    let zone = &snapshot.zone_label;

    let headline = match &activity {
        Activity::Resting => format!("Resting at a Bench in {}", zone),
        Activity::HotSpring => format!("Relaxing in a Hot Spring in {}", zone),
        Activity::StagStation => format!("At the Stag Station in {}", zone),
        Activity::FightingBoss(boss) => format!("Fighting {} in {}", boss, zone),
        Activity::Exploring => format!("Exploring {}", zone),
    };

    PresenceStatus {
        activity,
        headline,
        subline: zone.clone(),
        icon_key,
        icon_text: snapshot.scene_name.clone(),
        session_start,
    }
}

/// Display name of the first boss in the snapshot
pub fn boss_name(snapshot: &Snapshot) -> String {
    snapshot
        .first_boss()
        .map(|boss| clean_object_name(&boss.name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_BOSS.to_string())
}

/// `False_Knight(Clone)` -> `False Knight`
fn clean_object_name(raw: &str) -> String {
    let mut name = raw.to_string();
    for token in DECORATION_TOKENS {
        name = name.replace(token, "");
    }

    name.replace('_', " ")
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words already in all caps are treated as acronyms and left alone
fn title_case_word(word: &str) -> String {
    let has_lower = word.chars().any(char::is_lowercase);
    if !has_lower && word.chars().any(char::is_uppercase) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
