//! Habit tracker feature
//!
//! Loads memos and keeps the contribution grid for the selected range and
//! display mode up to date. Also saves habit configs and plain posts, and
//! drives the daily habit editor:
//!
//! ```text
//! Closed -> OpenEditor -> Open -> ToggleHabit* -> Open
//! Open -> ConfirmEditor (nothing selected, existing log) -> DeleteConfirmPending
//! DeleteConfirmPending -> ConfirmDelete -> Saving | CancelDelete -> Open
//! Open -> ConfirmEditor (something selected) -> Saving
//! Saving -> EditorSaved -> Closed | MemoOperationFailed -> Open (with error)
//! ```
//!
//! Effects may finish in any order. Memo lists carry the number of the load
//! that produced them and only a newer one replaces what is shown. Failures
//! name the operation they belong to and clear only its in-flight flag.

use crate::application::activity_cache::{ActivityCache, ActivityKey, ActivityResult};
use crate::application::feature::{EffectHandler, Feature, Reducer};
use crate::application::ports::Clock;
use crate::domain::habits::{
    build_daily_content, build_habits_config_content_from_list, extract_completed_habits,
    HabitConfig,
};
use crate::domain::{
    ActivityDisplayMode, ActivityRange, ActivitySnapshot, DailyMemoInfo, TimeRangeTab,
};
use crate::error::MemoTrackError;
use crate::infrastructure::MemosRepository;
use chrono::NaiveDate;
use futures_util::future::ready;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Daily log being edited
#[derive(Debug, Clone, PartialEq)]
pub struct HabitEditor {
    pub date: NaiveDate,
    /// Habits in effect on `date`, in config order
    pub habits: Vec<HabitConfig>,
    pub selections: BTreeMap<String, bool>,
    pub existing: Option<DailyMemoInfo>,
    pub error: Option<String>,
}

impl HabitEditor {
    pub fn selected_tags(&self) -> Vec<&str> {
        self.habits
            .iter()
            .filter(|h| self.selections.get(&h.tag).copied().unwrap_or(false))
            .map(|h| h.tag.as_str())
            .collect()
    }

    fn content(&self) -> String {
        build_daily_content(self.date, &self.habits, &self.selections)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditorState {
    #[default]
    Closed,
    Open(HabitEditor),
    DeleteConfirmPending(HabitEditor),
    Saving(HabitEditor),
}

impl EditorState {
    pub fn editor(&self) -> Option<&HabitEditor> {
        match self {
            EditorState::Closed => None,
            EditorState::Open(e) | EditorState::DeleteConfirmPending(e) | EditorState::Saving(e) => {
                Some(e)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HabitsState {
    pub today: NaiveDate,
    pub range: ActivityRange,
    pub display_mode: ActivityDisplayMode,
    /// Cache generation of the memo list in `snapshot`
    pub generation: u64,
    /// Number of the most recent memo list request
    pub load_request: u64,
    /// Request number of the memo list in `snapshot`
    pub applied_request: u64,
    pub snapshot: Option<Arc<ActivitySnapshot>>,
    /// Memo list request in flight
    pub is_refreshing: bool,
    /// Aggregation for the current range is being computed
    pub is_loading: bool,
    pub activity: Option<ActivityResult>,
    pub editor: EditorState,
    pub config_saving: bool,
    pub post_saving: bool,
    /// Name of the last post created through [`HabitsAction::CreatePost`]
    pub last_post: Option<String>,
    pub error: Option<String>,
}

impl HabitsState {
    pub fn new(today: NaiveDate, range: ActivityRange) -> Self {
        HabitsState {
            today,
            range,
            display_mode: ActivityDisplayMode::default(),
            generation: 0,
            load_request: 0,
            applied_request: 0,
            snapshot: None,
            is_refreshing: false,
            is_loading: false,
            activity: None,
            editor: EditorState::Closed,
            config_saving: false,
            post_saving: false,
            last_post: None,
            error: None,
        }
    }

    pub fn activity_key(&self) -> ActivityKey {
        (self.range, self.display_mode)
    }

    /// Activity for the current range, mode and memo generation
    pub fn current_activity(&self) -> Option<&ActivityResult> {
        self.activity
            .as_ref()
            .filter(|a| a.generation == self.generation && a.key == self.activity_key())
    }

    /// Nothing in flight and the grid matches the selection
    pub fn is_settled(&self) -> bool {
        !self.is_refreshing
            && !self.is_loading
            && !self.config_saving
            && !self.post_saving
            && !matches!(self.editor, EditorState::Saving(_))
            && (self.snapshot.is_none() || self.current_activity().is_some())
    }

    /// Latest habit configuration, empty before any config exists
    pub fn current_habits(&self) -> Vec<HabitConfig> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.config_timeline.last())
            .map(|entry| entry.habits.clone())
            .unwrap_or_default()
    }
}

/// Where a newly created memo belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTarget {
    DailyLog,
    HabitsConfig,
    Post,
}

impl CreateTarget {
    fn operation(self) -> MemoOperation {
        match self {
            CreateTarget::DailyLog => MemoOperation::EditorWrite,
            CreateTarget::HabitsConfig => MemoOperation::ConfigSave,
            CreateTarget::Post => MemoOperation::Post,
        }
    }
}

/// The in-flight operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoOperation {
    Load { request: u64 },
    Compute { generation: u64, key: ActivityKey },
    /// Create, update or delete of the daily log open in the editor
    EditorWrite,
    ConfigSave,
    Post,
}

#[derive(Debug, Clone)]
pub enum HabitsAction {
    Load,
    MemosLoaded {
        request: u64,
        generation: u64,
        snapshot: Arc<ActivitySnapshot>,
        today: NaiveDate,
    },
    MemoOperationFailed {
        operation: MemoOperation,
        message: String,
    },

    SelectTab(TimeRangeTab),
    SelectRange(ActivityRange),
    ShiftRange(i32),
    SetDisplayMode(ActivityDisplayMode),
    ActivityLoadingStarted {
        generation: u64,
        key: ActivityKey,
    },
    ActivityComputed(ActivityResult),

    OpenEditor(NaiveDate),
    ToggleHabit(String),
    ConfirmEditor,
    ConfirmDelete,
    CancelDelete,
    CloseEditor,
    EditorSaved,

    SaveHabitsConfig(Vec<HabitConfig>),
    AddHabit(HabitConfig),
    RemoveHabit(String),
    ConfigSaved,

    /// Plain memo that counts towards the posts view
    CreatePost(String),
    PostSaved(String),
}

#[derive(Debug, Clone)]
pub enum HabitsEffect {
    LoadMemos {
        request: u64,
    },
    ComputeActivity {
        generation: u64,
        key: ActivityKey,
        snapshot: Arc<ActivitySnapshot>,
        today: NaiveDate,
    },
    CreateMemo {
        content: String,
        target: CreateTarget,
    },
    UpdateMemo {
        name: String,
        content: String,
    },
    DeleteMemo {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HabitsReducer;

fn compute_effect(state: &HabitsState) -> Vec<HabitsEffect> {
    match &state.snapshot {
        Some(snapshot) => vec![HabitsEffect::ComputeActivity {
            generation: state.generation,
            key: state.activity_key(),
            snapshot: snapshot.clone(),
            today: state.today,
        }],
        None => Vec::new(),
    }
}

fn refresh(state: &mut HabitsState) -> Vec<HabitsEffect> {
    state.load_request += 1;
    state.is_refreshing = true;
    state.error = None;
    vec![HabitsEffect::LoadMemos {
        request: state.load_request,
    }]
}

fn open_editor(state: &HabitsState, date: NaiveDate) -> Result<HabitEditor, String> {
    let snapshot = state
        .snapshot
        .as_ref()
        .ok_or_else(|| "Memos are not loaded yet".to_string())?;

    if date > state.today {
        return Err(format!("Cannot log habits for {}, it is in the future", date));
    }

    let habits = snapshot.habits_for_date(date).to_vec();
    if habits.is_empty() {
        return Err(format!("No habits are configured for {}", date));
    }

    let existing = snapshot.daily_memos.get(&date).cloned();
    let done = existing
        .as_ref()
        .map(|memo| extract_completed_habits(&memo.content, habits.iter().map(|h| h.tag.as_str())))
        .unwrap_or_default();
    let selections = habits
        .iter()
        .map(|h| (h.tag.clone(), done.contains(&h.tag)))
        .collect();

    Ok(HabitEditor {
        date,
        habits,
        selections,
        existing,
        error: None,
    })
}

fn save_config(state: &mut HabitsState, habits: Vec<HabitConfig>) -> Vec<HabitsEffect> {
    if habits.is_empty() {
        state.error = Some("A habit configuration needs at least one habit".to_string());
        return Vec::new();
    }
    if state.config_saving {
        return Vec::new();
    }

    state.config_saving = true;
    state.error = None;
    vec![HabitsEffect::CreateMemo {
        content: build_habits_config_content_from_list(&habits),
        target: CreateTarget::HabitsConfig,
    }]
}

impl Reducer for HabitsReducer {
    type State = HabitsState;
    type Action = HabitsAction;
    type Effect = HabitsEffect;

    fn reduce(&self, state: &HabitsState, action: HabitsAction) -> (HabitsState, Vec<HabitsEffect>) {
        let mut next = state.clone();

        let effects = match action {
            HabitsAction::Load => refresh(&mut next),

            HabitsAction::MemosLoaded {
                request,
                generation,
                snapshot,
                today,
            } => {
                // Older than the list already shown
                if request <= next.applied_request {
                    return (next, Vec::new());
                }
                next.applied_request = request;
                next.generation = generation;
                next.snapshot = Some(snapshot);
                next.today = today;
                next.is_refreshing = request < next.load_request;
                compute_effect(&next)
            }

            HabitsAction::MemoOperationFailed { operation, message } => {
                match operation {
                    MemoOperation::Load { request } => {
                        if request < next.load_request {
                            return (next, Vec::new());
                        }
                        next.is_refreshing = false;
                    }
                    MemoOperation::Compute { generation, key } => {
                        if generation != next.generation || key != next.activity_key() {
                            return (next, Vec::new());
                        }
                        next.is_loading = false;
                    }
                    MemoOperation::EditorWrite => {
                        next.editor = match std::mem::take(&mut next.editor) {
                            EditorState::Saving(mut editor) => {
                                editor.error = Some(message.clone());
                                EditorState::Open(editor)
                            }
                            other => other,
                        };
                    }
                    MemoOperation::ConfigSave => next.config_saving = false,
                    MemoOperation::Post => next.post_saving = false,
                }
                next.error = Some(message);
                Vec::new()
            }

            HabitsAction::SelectTab(tab) => {
                next.range = ActivityRange::current(tab, next.today);
                compute_effect(&next)
            }

            HabitsAction::SelectRange(range) => {
                next.range = range;
                compute_effect(&next)
            }

            HabitsAction::ShiftRange(delta) => match next.range.shift(delta) {
                // Periods after the current one have nothing to show
                Some(shifted)
                    if !ActivityRange::current(shifted.tab(), next.today).is_before(&shifted) =>
                {
                    next.range = shifted;
                    compute_effect(&next)
                }
                _ => Vec::new(),
            },

            HabitsAction::SetDisplayMode(mode) => {
                next.display_mode = mode;
                compute_effect(&next)
            }

            HabitsAction::ActivityLoadingStarted { generation, key } => {
                if generation == next.generation && key == next.activity_key() {
                    next.is_loading = true;
                }
                Vec::new()
            }

            HabitsAction::ActivityComputed(result) => {
                if result.generation == next.generation && result.key == next.activity_key() {
                    next.is_loading = false;
                    next.activity = Some(result);
                }
                Vec::new()
            }

            HabitsAction::OpenEditor(date) => {
                if matches!(next.editor, EditorState::Saving(_)) {
                    return (next, Vec::new());
                }
                match open_editor(&next, date) {
                    Ok(editor) => {
                        next.error = None;
                        next.editor = EditorState::Open(editor);
                    }
                    Err(message) => next.error = Some(message),
                }
                Vec::new()
            }

            HabitsAction::ToggleHabit(tag) => {
                if let EditorState::Open(editor) = &mut next.editor {
                    if let Some(selected) = editor.selections.get_mut(&tag) {
                        *selected = !*selected;
                        editor.error = None;
                    }
                }
                Vec::new()
            }

            HabitsAction::ConfirmEditor => match std::mem::take(&mut next.editor) {
                EditorState::Open(mut editor) => {
                    let has_selection = !editor.selected_tags().is_empty();
                    let existing = editor.existing.as_ref().map(|memo| memo.name.clone());
                    match (existing, has_selection) {
                        (Some(name), true) => {
                            let effect = HabitsEffect::UpdateMemo {
                                name,
                                content: editor.content(),
                            };
                            next.editor = EditorState::Saving(editor);
                            vec![effect]
                        }
                        (None, true) => {
                            let effect = HabitsEffect::CreateMemo {
                                content: editor.content(),
                                target: CreateTarget::DailyLog,
                            };
                            next.editor = EditorState::Saving(editor);
                            vec![effect]
                        }
                        (Some(_), false) => {
                            next.editor = EditorState::DeleteConfirmPending(editor);
                            Vec::new()
                        }
                        (None, false) => {
                            editor.error = Some("Select at least one habit".to_string());
                            next.editor = EditorState::Open(editor);
                            Vec::new()
                        }
                    }
                }
                other => {
                    next.editor = other;
                    Vec::new()
                }
            },

            HabitsAction::ConfirmDelete => match std::mem::take(&mut next.editor) {
                EditorState::DeleteConfirmPending(editor) => {
                    let effects = editor
                        .existing
                        .as_ref()
                        .map(|memo| HabitsEffect::DeleteMemo {
                            name: memo.name.clone(),
                        })
                        .into_iter()
                        .collect();
                    next.editor = EditorState::Saving(editor);
                    effects
                }
                other => {
                    next.editor = other;
                    Vec::new()
                }
            },

            HabitsAction::CancelDelete => {
                next.editor = match std::mem::take(&mut next.editor) {
                    EditorState::DeleteConfirmPending(editor) => EditorState::Open(editor),
                    other => other,
                };
                Vec::new()
            }

            HabitsAction::CloseEditor => {
                if !matches!(next.editor, EditorState::Saving(_)) {
                    next.editor = EditorState::Closed;
                }
                Vec::new()
            }

            HabitsAction::EditorSaved => {
                next.editor = EditorState::Closed;
                refresh(&mut next)
            }

            HabitsAction::SaveHabitsConfig(habits) => save_config(&mut next, habits),

            HabitsAction::AddHabit(habit) => {
                let mut habits = next.current_habits();
                if habits.iter().any(|h| h.tag == habit.tag) {
                    next.error = Some(format!("Habit {} already exists", habit.tag));
                    Vec::new()
                } else {
                    habits.push(habit);
                    save_config(&mut next, habits)
                }
            }

            HabitsAction::RemoveHabit(tag) => {
                let mut habits = next.current_habits();
                let before = habits.len();
                habits.retain(|h| h.tag != tag);
                if habits.len() == before {
                    next.error = Some(format!("Habit {} is not configured", tag));
                    Vec::new()
                } else {
                    save_config(&mut next, habits)
                }
            }

            HabitsAction::ConfigSaved => {
                next.config_saving = false;
                refresh(&mut next)
            }

            HabitsAction::CreatePost(content) => {
                let content = content.trim();
                if content.is_empty() {
                    next.error = Some("Memo text is empty".to_string());
                    Vec::new()
                } else if next.post_saving {
                    Vec::new()
                } else {
                    next.post_saving = true;
                    next.error = None;
                    vec![HabitsEffect::CreateMemo {
                        content: content.to_string(),
                        target: CreateTarget::Post,
                    }]
                }
            }

            HabitsAction::PostSaved(name) => {
                next.post_saving = false;
                next.last_post = Some(name);
                refresh(&mut next)
            }
        };

        (next, effects)
    }
}

/// Runs habit effects against the active repository
pub struct HabitsEffects {
    repository: Arc<dyn MemosRepository>,
    clock: Arc<dyn Clock>,
    cache: Arc<ActivityCache>,
}

impl HabitsEffects {
    pub fn new(
        repository: Arc<dyn MemosRepository>,
        clock: Arc<dyn Clock>,
        cache: Arc<ActivityCache>,
    ) -> Self {
        HabitsEffects {
            repository,
            clock,
            cache,
        }
    }
}

fn failed(operation: MemoOperation, error: MemoTrackError) -> HabitsAction {
    warn!(?operation, error = %error, "habit memo operation failed");
    HabitsAction::MemoOperationFailed {
        operation,
        message: error.to_string(),
    }
}

impl EffectHandler for HabitsEffects {
    type Effect = HabitsEffect;
    type Action = HabitsAction;

    fn handle(&self, effect: HabitsEffect) -> BoxStream<'static, HabitsAction> {
        let repository = self.repository.clone();

        match effect {
            HabitsEffect::LoadMemos { request } => {
                let clock = self.clock.clone();
                let cache = self.cache.clone();
                let operation = MemoOperation::Load { request };
                stream::once(async move {
                    let memos = match repository.load_memos().await {
                        Ok(memos) => memos,
                        Err(e) => return failed(operation, e),
                    };
                    let today = clock.today();
                    let offset = clock.offset();
                    match tokio::task::spawn_blocking(move || {
                        ActivitySnapshot::from_memos(memos, offset)
                    })
                    .await
                    {
                        Ok(snapshot) => HabitsAction::MemosLoaded {
                            request,
                            generation: cache.next_generation(),
                            snapshot: Arc::new(snapshot),
                            today,
                        },
                        Err(e) => failed(operation, MemoTrackError::Background(e.to_string())),
                    }
                })
                .boxed()
            }

            HabitsEffect::ComputeActivity {
                generation,
                key,
                snapshot,
                today,
            } => {
                if let Some(result) = self.cache.get(generation, key) {
                    return stream::once(ready(HabitsAction::ActivityComputed(result))).boxed();
                }

                let cache = self.cache.clone();
                let started = stream::once(ready(HabitsAction::ActivityLoadingStarted {
                    generation,
                    key,
                }));
                let computed = stream::once(async move {
                    match cache.get_or_compute(generation, key, snapshot, today).await {
                        Ok(result) => HabitsAction::ActivityComputed(result),
                        Err(e) => failed(MemoOperation::Compute { generation, key }, e),
                    }
                });
                started.chain(computed).boxed()
            }

            HabitsEffect::CreateMemo { content, target } => stream::once(async move {
                match repository.create_memo(&content).await {
                    Ok(memo) => match target {
                        CreateTarget::DailyLog => HabitsAction::EditorSaved,
                        CreateTarget::HabitsConfig => HabitsAction::ConfigSaved,
                        CreateTarget::Post => HabitsAction::PostSaved(memo.name),
                    },
                    Err(e) => failed(target.operation(), e),
                }
            })
            .boxed(),

            HabitsEffect::UpdateMemo { name, content } => stream::once(async move {
                match repository.update_memo(&name, &content).await {
                    Ok(_) => HabitsAction::EditorSaved,
                    Err(e) => failed(MemoOperation::EditorWrite, e),
                }
            })
            .boxed(),

            HabitsEffect::DeleteMemo { name } => stream::once(async move {
                match repository.delete_memo(&name).await {
                    Ok(()) => HabitsAction::EditorSaved,
                    Err(e) => failed(MemoOperation::EditorWrite, e),
                }
            })
            .boxed(),
        }
    }
}

pub type HabitsFeature = Feature<HabitsReducer, HabitsEffects>;

/// Start the habit tracker on the current period of `tab`
pub fn habits_feature(
    tab: TimeRangeTab,
    repository: Arc<dyn MemosRepository>,
    clock: Arc<dyn Clock>,
    cache: Arc<ActivityCache>,
) -> HabitsFeature {
    let today = clock.today();
    let state = HabitsState::new(today, ActivityRange::current(tab, today));
    Feature::new(
        state,
        HabitsReducer,
        HabitsEffects::new(repository, clock, cache),
    )
}
