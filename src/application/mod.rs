//! Application layer - State-machine runtime, features and collaborator ports

pub mod activity_cache;
pub mod feature;
pub mod habits;
pub mod mode_selection;
pub mod ports;
pub mod settings;

pub use activity_cache::{ActivityCache, ActivityKey, ActivityResult};
pub use feature::{EffectHandler, Feature, Reducer};
pub use habits::{
    habits_feature, EditorState, HabitsAction, HabitsFeature, HabitsState, MemoOperation,
};
pub use mode_selection::{
    mode_selection_feature, ModeSelectionAction, ModeSelectionFeature, ModeSelectionState,
};
pub use ports::{Clock, CredentialsValidator, FixedClock, ModeSwitcher, SettingsStore, SystemClock};
pub use settings::{
    settings_feature, CredentialsDialog, ResetState, SettingsAction, SettingsFeature,
    SettingsState,
};
