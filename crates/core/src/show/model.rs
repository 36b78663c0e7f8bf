use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of effect a step renders. The scheduler only cares that a step
/// *has* a kind; the renderer interprets it.
///
/// Unknown tags deserialize into `Other` so a show authored against a newer
/// effect catalogue survives a round trip through an older server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    Emojis,
    Flash,
    Blackout,
    Shuffle,
    Reveal,
    Video,
    Words,
    Audio,
    Text,
    Number,
    Countdown,
    Pulse,
    Breathing,
    Glitch,
    Shake,
    Zoom,
    Heart,
    Spiral,
    Ripple,
    Arrow,
    CardFlip,
    Dice,
    Color,
    #[serde(untagged)]
    Other(String),
}

/// Type-specific step payload. Opaque to the scheduler; forwarded untouched
/// to the renderer. Fields not modelled here survive in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One atomic effect instance on a routine's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identity for editing/reordering. Unique within its routine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Nominal time this step occupies, in milliseconds. Zero is legal and
    /// occupies no timeline.
    #[serde(default)]
    pub duration: u64,
    /// Inactive steps are kept in storage but invisible to scheduling.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(flatten)]
    pub params: StepParams,
}

fn default_active() -> bool {
    true
}

impl Step {
    pub fn new(kind: StepKind, duration: u64) -> Self {
        Self {
            id: None,
            kind,
            duration,
            active: true,
            params: StepParams::default(),
        }
    }
}

/// A named, ordered sequence of steps. Order is playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Server-clock epoch millisecond at which playback of this routine's
    /// active steps begins. Absent means not currently triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_time: Option<u64>,
}

impl Routine {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            trigger_time: None,
        }
    }

    /// Steps that participate in scheduling, in playback order.
    pub fn active_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|step| step.active)
    }

    /// Total timeline length of the active steps, in milliseconds.
    pub fn total_active_duration(&self) -> u64 {
        self.active_steps().map(|step| step.duration).sum()
    }
}

/// The single authoritative show aggregate.
///
/// Presentation configuration (logo, texts, zoom, colors, ...) is carried as
/// opaque key-value data in `presentation`; only the fields the engine needs
/// are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowState {
    pub routines: Vec<Routine>,
    /// Index of the routine currently selected for triggering/editing.
    /// Out-of-range means "no active routine"; not server-enforced.
    #[serde(default)]
    pub active_routine_index: usize,
    /// Default synchronization delay between trigger and start, in seconds.
    #[serde(default = "default_synchro_delay")]
    pub synchro_delay: f64,
    /// Where spectators are sent once a routine finishes. Empty disables.
    #[serde(default)]
    pub redirection_url: String,
    #[serde(flatten)]
    pub presentation: Map<String, Value>,
}

fn default_synchro_delay() -> f64 {
    2.0
}

impl Default for ShowState {
    fn default() -> Self {
        let mut demo = Routine::new("demo-routine", "Demo Routine");
        demo.steps = vec![
            Step::new(StepKind::Emojis, 5000),
            Step::new(StepKind::Flash, 2000),
        ];

        let mut presentation = Map::new();
        presentation.insert("logoUrl".into(), Value::String(String::new()));
        presentation.insert("logoVisible".into(), Value::Bool(false));
        presentation.insert("logoZoom".into(), Value::from(100));
        presentation.insert("startImageSource".into(), Value::String("logo".into()));
        presentation.insert("startImageUrl".into(), Value::String(String::new()));
        presentation.insert("welcomeText".into(), Value::String(String::new()));
        presentation.insert("subText".into(), Value::String(String::new()));
        presentation.insert("tagline".into(), Value::String(String::new()));

        Self {
            routines: vec![demo],
            active_routine_index: 0,
            synchro_delay: default_synchro_delay(),
            redirection_url: String::new(),
            presentation,
        }
    }
}

impl ShowState {
    /// The routine selected for triggering, or `None` when the index does
    /// not resolve.
    pub fn active_routine(&self) -> Option<&Routine> {
        self.routines.get(self.active_routine_index)
    }

    pub fn active_routine_mut(&mut self) -> Option<&mut Routine> {
        self.routines.get_mut(self.active_routine_index)
    }
}

/// A whole-object replacement candidate sent by the writer.
///
/// Every top-level field is optional; [`ShowStateUpdate::merge_into`] applies
/// the fields that are present and leaves the rest of the previous state
/// untouched. This is last-full-write-wins replication, not a patch format:
/// a writer that wants a field preserved must keep sending it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routines: Option<Vec<Routine>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_routine_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synchro_delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirection_url: Option<String>,
    #[serde(flatten)]
    pub presentation: Map<String, Value>,
}

impl ShowStateUpdate {
    /// Shallow merge: each field present in the candidate replaces the
    /// corresponding field of `state`. Presentation keys are merged at the
    /// top level only, no nested merge.
    pub fn merge_into(self, state: &mut ShowState) {
        if let Some(routines) = self.routines {
            state.routines = routines;
        }
        if let Some(index) = self.active_routine_index {
            state.active_routine_index = index;
        }
        if let Some(delay) = self.synchro_delay {
            state.synchro_delay = delay;
        }
        if let Some(url) = self.redirection_url {
            state.redirection_url = url;
        }
        for (key, value) in self.presentation {
            state.presentation.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_show_has_demo_routine() {
        let state = ShowState::default();
        assert_eq!(state.routines.len(), 1);
        let demo = state.active_routine().unwrap();
        assert_eq!(demo.id, "demo-routine");
        assert_eq!(demo.steps.len(), 2);
        assert_eq!(demo.total_active_duration(), 7000);
    }

    #[test]
    fn out_of_range_index_means_no_active_routine() {
        let mut state = ShowState::default();
        state.active_routine_index = 5;
        assert!(state.active_routine().is_none());
    }

    #[test]
    fn active_steps_skips_inactive() {
        let mut routine = Routine::new("r", "R");
        routine.steps = vec![
            Step::new(StepKind::Emojis, 1000),
            Step {
                active: false,
                ..Step::new(StepKind::Flash, 9000)
            },
            Step::new(StepKind::Blackout, 500),
        ];
        assert_eq!(routine.active_steps().count(), 2);
        assert_eq!(routine.total_active_duration(), 1500);
    }

    #[test]
    fn step_wire_format_matches_original() {
        let json = r#"{"type":"emojis","duration":5000,"active":true}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.kind, StepKind::Emojis);
        assert_eq!(step.duration, 5000);
        assert!(step.active);

        let json = r#"{"type":"cardFlip","duration":1000,"active":true,"value":"cards/AC.jpg"}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.kind, StepKind::CardFlip);
        assert_eq!(step.params.value, Some(Value::String("cards/AC.jpg".into())));
    }

    #[test]
    fn unknown_step_kind_round_trips() {
        let json = r#"{"type":"laserMaze","duration":100,"active":true}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.kind, StepKind::Other("laserMaze".into()));
        let out = serde_json::to_value(&step).unwrap();
        assert_eq!(out["type"], "laserMaze");
    }

    #[test]
    fn merge_retains_absent_fields() {
        let mut state = ShowState::default();
        state.redirection_url = "https://example.com/after".into();

        let update = ShowStateUpdate {
            routines: Some(vec![Routine::new("r2", "Second")]),
            active_routine_index: Some(0),
            ..Default::default()
        };
        update.merge_into(&mut state);

        assert_eq!(state.routines.len(), 1);
        assert_eq!(state.routines[0].id, "r2");
        // Fields absent from the candidate survive from before.
        assert_eq!(state.redirection_url, "https://example.com/after");
        assert_eq!(state.synchro_delay, 2.0);
    }

    #[test]
    fn merge_overrides_presentation_keys_shallowly() {
        let mut state = ShowState::default();

        let mut update = ShowStateUpdate::default();
        update
            .presentation
            .insert("welcomeText".into(), Value::String("Bienvenue".into()));
        update.merge_into(&mut state);

        assert_eq!(state.presentation["welcomeText"], "Bienvenue");
        // Untouched presentation keys are retained.
        assert_eq!(state.presentation["logoZoom"], 100);
    }
}
