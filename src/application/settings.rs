//! Settings feature
//!
//! Credentials dialog with server-side validation, theme, language and
//! default time range preferences, and a confirmed app reset.

use crate::application::feature::{EffectHandler, Feature, Reducer};
use crate::application::ports::{CredentialsValidator, ModeSwitcher, SettingsStore};
use crate::domain::{AppDetails, AppMode, Credentials, Preferences, Theme, TimeRangeTab};
use crate::error::Result;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

/// Login form shared by settings and mode selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialsDialog {
    #[default]
    Closed,
    Editing {
        host: String,
        token: String,
        error: Option<String>,
    },
    Validating {
        credentials: Credentials,
    },
}

impl CredentialsDialog {
    pub fn open(prefill: Option<&Credentials>) -> Self {
        CredentialsDialog::Editing {
            host: prefill.map(|c| c.host.clone()).unwrap_or_default(),
            token: prefill.map(|c| c.token.clone()).unwrap_or_default(),
            error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, CredentialsDialog::Closed)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CredentialsDialog::Editing { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_host(&mut self, value: String) {
        if let CredentialsDialog::Editing { host, error, .. } = self {
            *host = value;
            *error = None;
        }
    }

    pub(crate) fn set_token(&mut self, value: String) {
        if let CredentialsDialog::Editing { token, error, .. } = self {
            *token = value;
            *error = None;
        }
    }

    /// Move to `Validating` if the input passes local checks, otherwise
    /// keep editing with an inline error
    pub(crate) fn submit(&mut self) -> Option<Credentials> {
        let CredentialsDialog::Editing { host, token, error } = self else {
            return None;
        };

        let credentials = Credentials::new(host.trim(), token.trim());
        if let Some(message) = credentials.validation_error() {
            *error = Some(message);
            return None;
        }

        *self = CredentialsDialog::Validating {
            credentials: credentials.clone(),
        };
        Some(credentials)
    }

    /// Back to editing the rejected input with the reason shown
    pub(crate) fn reject(&mut self, reason: String) {
        if let CredentialsDialog::Validating { credentials } = self {
            *self = CredentialsDialog::Editing {
                host: credentials.host.clone(),
                token: credentials.token.clone(),
                error: Some(reason),
            };
        }
    }
}

/// Validate with the server, then persist and activate online mode
pub(crate) async fn log_in(
    validator: &dyn CredentialsValidator,
    store: &dyn SettingsStore,
    switcher: &dyn ModeSwitcher,
    credentials: &Credentials,
) -> Result<()> {
    validator.validate(credentials).await?;
    store.save_credentials(credentials).await?;
    store.save_app_mode(AppMode::Online).await?;
    switcher.switch_mode(AppMode::Online, Some(credentials.clone()));
    info!(host = %credentials.base_url(), "logged in");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetState {
    #[default]
    Idle,
    ConfirmPending,
    Resetting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsState {
    pub loaded: bool,
    pub mode: AppMode,
    pub credentials: Option<Credentials>,
    pub preferences: Preferences,
    pub app_details: Option<AppDetails>,
    pub dialog: CredentialsDialog,
    pub reset: ResetState,
    /// Preference writes still in flight
    pub pending_writes: usize,
    pub error: Option<String>,
}

impl SettingsState {
    pub fn is_settled(&self) -> bool {
        self.loaded
            && self.pending_writes == 0
            && !matches!(self.dialog, CredentialsDialog::Validating { .. })
            && self.reset != ResetState::Resetting
    }
}

#[derive(Debug, Clone)]
pub enum SettingsAction {
    Load,
    Loaded {
        mode: AppMode,
        credentials: Option<Credentials>,
        preferences: Preferences,
        details: AppDetails,
    },
    LoadFailed(String),

    OpenCredentialsDialog,
    EditHost(String),
    EditToken(String),
    SubmitCredentials,
    ValidationSucceeded(Credentials),
    ValidationFailed(String),
    CloseCredentialsDialog,

    SetTheme(Theme),
    SetLanguage(Option<String>),
    SetTimeRangeTab(TimeRangeTab),
    PreferenceSaved,
    PreferenceFailed(String),

    RequestReset,
    CancelReset,
    ConfirmReset,
    ResetCompleted,
    ResetFailed(String),
}

#[derive(Debug, Clone)]
pub enum SettingsEffect {
    LoadAll,
    LogIn(Credentials),
    SaveTheme(Theme),
    SaveLanguage(Option<String>),
    SaveTimeRangeTab(TimeRangeTab),
    Reset,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsReducer;

impl Reducer for SettingsReducer {
    type State = SettingsState;
    type Action = SettingsAction;
    type Effect = SettingsEffect;

    fn reduce(
        &self,
        state: &SettingsState,
        action: SettingsAction,
    ) -> (SettingsState, Vec<SettingsEffect>) {
        let mut next = state.clone();

        let effects = match action {
            SettingsAction::Load => {
                next.error = None;
                vec![SettingsEffect::LoadAll]
            }

            SettingsAction::Loaded {
                mode,
                credentials,
                preferences,
                details,
            } => {
                next.loaded = true;
                next.mode = mode;
                next.credentials = credentials;
                next.preferences = preferences;
                next.app_details = Some(details);
                Vec::new()
            }

            SettingsAction::LoadFailed(message) => {
                next.loaded = true;
                next.error = Some(message);
                Vec::new()
            }

            SettingsAction::OpenCredentialsDialog => {
                if !next.dialog.is_open() {
                    next.dialog = CredentialsDialog::open(next.credentials.as_ref());
                }
                Vec::new()
            }

            SettingsAction::EditHost(host) => {
                next.dialog.set_host(host);
                Vec::new()
            }

            SettingsAction::EditToken(token) => {
                next.dialog.set_token(token);
                Vec::new()
            }

            SettingsAction::SubmitCredentials => next
                .dialog
                .submit()
                .map(SettingsEffect::LogIn)
                .into_iter()
                .collect(),

            SettingsAction::ValidationSucceeded(credentials) => {
                next.dialog = CredentialsDialog::Closed;
                next.credentials = Some(credentials);
                next.mode = AppMode::Online;
                next.error = None;
                Vec::new()
            }

            SettingsAction::ValidationFailed(reason) => {
                next.dialog.reject(reason);
                Vec::new()
            }

            SettingsAction::CloseCredentialsDialog => {
                if !matches!(next.dialog, CredentialsDialog::Validating { .. }) {
                    next.dialog = CredentialsDialog::Closed;
                }
                Vec::new()
            }

            SettingsAction::SetTheme(theme) => {
                next.preferences.theme = theme;
                next.pending_writes += 1;
                vec![SettingsEffect::SaveTheme(theme)]
            }

            SettingsAction::SetLanguage(language) => {
                next.preferences.language = language.clone();
                next.pending_writes += 1;
                vec![SettingsEffect::SaveLanguage(language)]
            }

            SettingsAction::SetTimeRangeTab(tab) => {
                next.preferences.time_range_tab = tab;
                next.pending_writes += 1;
                vec![SettingsEffect::SaveTimeRangeTab(tab)]
            }

            SettingsAction::PreferenceSaved => {
                next.pending_writes = next.pending_writes.saturating_sub(1);
                Vec::new()
            }

            SettingsAction::PreferenceFailed(message) => {
                next.pending_writes = next.pending_writes.saturating_sub(1);
                next.error = Some(message);
                Vec::new()
            }

            SettingsAction::RequestReset => {
                if next.reset != ResetState::Resetting {
                    next.reset = ResetState::ConfirmPending;
                }
                Vec::new()
            }

            SettingsAction::CancelReset => {
                if next.reset == ResetState::ConfirmPending {
                    next.reset = ResetState::Idle;
                }
                Vec::new()
            }

            SettingsAction::ConfirmReset => {
                if next.reset == ResetState::ConfirmPending {
                    next.reset = ResetState::Resetting;
                    vec![SettingsEffect::Reset]
                } else {
                    Vec::new()
                }
            }

            SettingsAction::ResetCompleted => {
                next.reset = ResetState::Done;
                next.mode = AppMode::NotSelected;
                next.credentials = None;
                next.preferences = Preferences::default();
                next.dialog = CredentialsDialog::Closed;
                Vec::new()
            }

            SettingsAction::ResetFailed(message) => {
                next.reset = ResetState::Idle;
                next.error = Some(message);
                Vec::new()
            }
        };

        (next, effects)
    }
}

pub struct SettingsEffects {
    store: Arc<dyn SettingsStore>,
    validator: Arc<dyn CredentialsValidator>,
    switcher: Arc<dyn ModeSwitcher>,
}

impl SettingsEffects {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        validator: Arc<dyn CredentialsValidator>,
        switcher: Arc<dyn ModeSwitcher>,
    ) -> Self {
        SettingsEffects {
            store,
            validator,
            switcher,
        }
    }
}

fn preference_result(result: Result<()>) -> SettingsAction {
    match result {
        Ok(()) => SettingsAction::PreferenceSaved,
        Err(e) => {
            warn!(error = %e, "saving preference failed");
            SettingsAction::PreferenceFailed(e.to_string())
        }
    }
}

impl EffectHandler for SettingsEffects {
    type Effect = SettingsEffect;
    type Action = SettingsAction;

    fn handle(&self, effect: SettingsEffect) -> BoxStream<'static, SettingsAction> {
        let store = self.store.clone();

        match effect {
            SettingsEffect::LoadAll => stream::once(async move {
                let loaded = async {
                    Ok::<_, crate::error::MemoTrackError>(SettingsAction::Loaded {
                        mode: store.load_app_mode().await?,
                        credentials: store.load_credentials().await?,
                        preferences: store.load_preferences().await?,
                        details: store.app_details(),
                    })
                };
                loaded.await.unwrap_or_else(|e| {
                    warn!(error = %e, "loading settings failed");
                    SettingsAction::LoadFailed(e.to_string())
                })
            })
            .boxed(),

            SettingsEffect::LogIn(credentials) => {
                let validator = self.validator.clone();
                let switcher = self.switcher.clone();
                stream::once(async move {
                    match log_in(&*validator, &*store, &*switcher, &credentials).await {
                        Ok(()) => SettingsAction::ValidationSucceeded(credentials),
                        Err(e) => {
                            warn!(error = %e, "credential validation failed");
                            SettingsAction::ValidationFailed(e.to_string())
                        }
                    }
                })
                .boxed()
            }

            SettingsEffect::SaveTheme(theme) => {
                stream::once(async move { preference_result(store.save_theme(theme).await) })
                    .boxed()
            }

            SettingsEffect::SaveLanguage(language) => stream::once(async move {
                preference_result(store.save_language(language).await)
            })
            .boxed(),

            SettingsEffect::SaveTimeRangeTab(tab) => stream::once(async move {
                preference_result(store.save_time_range_tab(tab).await)
            })
            .boxed(),

            SettingsEffect::Reset => {
                let switcher = self.switcher.clone();
                stream::once(async move {
                    match store.reset().await {
                        Ok(()) => {
                            switcher.switch_mode(AppMode::NotSelected, None);
                            SettingsAction::ResetCompleted
                        }
                        Err(e) => {
                            warn!(error = %e, "reset failed");
                            SettingsAction::ResetFailed(e.to_string())
                        }
                    }
                })
                .boxed()
            }
        }
    }
}

pub type SettingsFeature = Feature<SettingsReducer, SettingsEffects>;

pub fn settings_feature(
    store: Arc<dyn SettingsStore>,
    validator: Arc<dyn CredentialsValidator>,
    switcher: Arc<dyn ModeSwitcher>,
) -> SettingsFeature {
    Feature::new(
        SettingsState::default(),
        SettingsReducer,
        SettingsEffects::new(store, validator, switcher),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoTrackError;
    use crate::infrastructure::MemorySettingsStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn reduce(state: &SettingsState, action: SettingsAction) -> (SettingsState, Vec<SettingsEffect>) {
        SettingsReducer.reduce(state, action)
    }

    struct StubValidator {
        accept: bool,
    }

    #[async_trait]
    impl CredentialsValidator for StubValidator {
        async fn validate(&self, _credentials: &Credentials) -> Result<()> {
            if self.accept {
                Ok(())
            } else {
                Err(MemoTrackError::InvalidCredentials("token rejected".into()))
            }
        }
    }

    #[derive(Default)]
    struct RecordingSwitcher {
        switches: Mutex<Vec<(AppMode, Option<Credentials>)>>,
    }

    impl ModeSwitcher for RecordingSwitcher {
        fn switch_mode(&self, mode: AppMode, credentials: Option<Credentials>) {
            self.switches.lock().unwrap().push((mode, credentials));
        }
    }

    #[test]
    fn test_blank_credentials_inline_error() {
        let (state, _) = reduce(&SettingsState::default(), SettingsAction::OpenCredentialsDialog);
        let (state, effects) = reduce(&state, SettingsAction::SubmitCredentials);
        assert!(effects.is_empty());
        assert!(state.dialog.error().unwrap().contains("blank"));

        let (state, _) = reduce(&state, SettingsAction::EditHost("memos.example.com".into()));
        assert!(state.dialog.error().is_none());
        let (state, _) = reduce(&state, SettingsAction::EditToken("tok".into()));
        let (state, effects) = reduce(&state, SettingsAction::SubmitCredentials);
        assert!(effects.is_empty());
        assert!(state.dialog.error().unwrap().contains("http"));
    }

    #[test]
    fn test_submit_starts_validation() {
        let (state, _) = reduce(&SettingsState::default(), SettingsAction::OpenCredentialsDialog);
        let (state, _) = reduce(&state, SettingsAction::EditHost(" https://m.example.com ".into()));
        let (state, _) = reduce(&state, SettingsAction::EditToken("tok".into()));
        let (state, effects) = reduce(&state, SettingsAction::SubmitCredentials);

        assert!(matches!(state.dialog, CredentialsDialog::Validating { .. }));
        assert!(matches!(
            effects.as_slice(),
            [SettingsEffect::LogIn(c)] if c.host == "https://m.example.com"
        ));

        let (failed, _) = reduce(&state, SettingsAction::ValidationFailed("401".into()));
        assert_eq!(failed.dialog.error(), Some("401"));

        let (ok, _) = reduce(
            &state,
            SettingsAction::ValidationSucceeded(Credentials::new("https://m.example.com", "tok")),
        );
        assert_eq!(ok.dialog, CredentialsDialog::Closed);
        assert_eq!(ok.mode, AppMode::Online);
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let state = SettingsState::default();
        let (state, effects) = reduce(&state, SettingsAction::ConfirmReset);
        assert!(effects.is_empty());
        assert_eq!(state.reset, ResetState::Idle);

        let (pending, _) = reduce(&state, SettingsAction::RequestReset);
        let (cancelled, _) = reduce(&pending, SettingsAction::CancelReset);
        assert_eq!(cancelled.reset, ResetState::Idle);

        let (resetting, effects) = reduce(&pending, SettingsAction::ConfirmReset);
        assert_eq!(resetting.reset, ResetState::Resetting);
        assert!(matches!(effects.as_slice(), [SettingsEffect::Reset]));
    }

    #[test]
    fn test_preference_writes_tracked() {
        let mut state = SettingsState {
            loaded: true,
            ..SettingsState::default()
        };
        let (next, effects) = reduce(&state, SettingsAction::SetTheme(Theme::Dark));
        assert_eq!(next.preferences.theme, Theme::Dark);
        assert_eq!(next.pending_writes, 1);
        assert_eq!(effects.len(), 1);
        assert!(!next.is_settled());

        state = reduce(&next, SettingsAction::PreferenceSaved).0;
        assert!(state.is_settled());
    }

    #[tokio::test]
    async fn test_feature_login_and_preferences() {
        let store = Arc::new(MemorySettingsStore::default());
        let switcher = Arc::new(RecordingSwitcher::default());
        let feature = settings_feature(
            store.clone(),
            Arc::new(StubValidator { accept: true }),
            switcher.clone(),
        );

        feature.send(SettingsAction::Load);
        feature.wait_for(|s| s.loaded).await.unwrap();

        feature.send(SettingsAction::OpenCredentialsDialog);
        feature.send(SettingsAction::EditHost("https://m.example.com/".into()));
        feature.send(SettingsAction::EditToken("secret".into()));
        feature.send(SettingsAction::SubmitCredentials);
        feature.send(SettingsAction::SetLanguage(Some("de".into())));

        let state = feature.wait_for(|s| s.is_settled()).await.unwrap();
        assert_eq!(state.mode, AppMode::Online);

        let saved = store.snapshot();
        assert_eq!(saved.mode, AppMode::Online);
        assert_eq!(saved.credentials.unwrap().token, "secret");
        assert_eq!(saved.preferences.language.as_deref(), Some("de"));
        assert_eq!(switcher.switches.lock().unwrap()[0].0, AppMode::Online);
    }

    #[tokio::test]
    async fn test_feature_rejected_credentials() {
        let store = Arc::new(MemorySettingsStore::default());
        let feature = settings_feature(
            store.clone(),
            Arc::new(StubValidator { accept: false }),
            Arc::new(RecordingSwitcher::default()),
        );

        feature.send(SettingsAction::OpenCredentialsDialog);
        feature.send(SettingsAction::EditHost("https://m.example.com".into()));
        feature.send(SettingsAction::EditToken("bad".into()));
        feature.send(SettingsAction::SubmitCredentials);

        let state = feature
            .wait_for(|s| s.dialog.error().is_some())
            .await
            .unwrap();
        assert!(state.dialog.error().unwrap().contains("token rejected"));
        assert!(store.snapshot().credentials.is_none());
    }

    #[tokio::test]
    async fn test_feature_reset() {
        let store = Arc::new(MemorySettingsStore::default());
        store.save_app_mode(AppMode::Demo).await.unwrap();
        let switcher = Arc::new(RecordingSwitcher::default());
        let feature = settings_feature(
            store.clone(),
            Arc::new(StubValidator { accept: true }),
            switcher.clone(),
        );

        feature.send(SettingsAction::RequestReset);
        feature.send(SettingsAction::ConfirmReset);
        let state = feature
            .wait_for(|s| s.reset == ResetState::Done)
            .await
            .unwrap();
        assert_eq!(state.mode, AppMode::NotSelected);
        assert_eq!(store.snapshot().mode, AppMode::NotSelected);
        assert_eq!(
            switcher.switches.lock().unwrap().last().unwrap().0,
            AppMode::NotSelected
        );
    }
}
