//! Mode selection feature
//!
//! Offline and demo are switched to immediately. Online first asks for
//! credentials and only switches once the server accepts them.

use crate::application::feature::{EffectHandler, Feature, Reducer};
use crate::application::ports::{CredentialsValidator, ModeSwitcher, SettingsStore};
use crate::application::settings::{log_in, CredentialsDialog};
use crate::domain::{AppMode, Credentials};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModeSelectionState {
    pub loaded: bool,
    pub current: AppMode,
    pub saved_credentials: Option<Credentials>,
    pub dialog: CredentialsDialog,
    /// Mode being saved
    pub switching_to: Option<AppMode>,
    pub error: Option<String>,
}

impl ModeSelectionState {
    pub fn is_settled(&self) -> bool {
        self.loaded
            && self.switching_to.is_none()
            && !matches!(self.dialog, CredentialsDialog::Validating { .. })
    }
}

#[derive(Debug, Clone)]
pub enum ModeSelectionAction {
    Load,
    Loaded {
        mode: AppMode,
        credentials: Option<Credentials>,
    },
    Select(AppMode),
    EditHost(String),
    EditToken(String),
    SubmitCredentials,
    ValidationSucceeded(Credentials),
    ValidationFailed(String),
    DismissCredentials,
    ModeSaved(AppMode),
    OperationFailed(String),
}

#[derive(Debug, Clone)]
pub enum ModeSelectionEffect {
    LoadMode,
    SaveMode(AppMode),
    LogIn(Credentials),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModeSelectionReducer;

impl Reducer for ModeSelectionReducer {
    type State = ModeSelectionState;
    type Action = ModeSelectionAction;
    type Effect = ModeSelectionEffect;

    fn reduce(
        &self,
        state: &ModeSelectionState,
        action: ModeSelectionAction,
    ) -> (ModeSelectionState, Vec<ModeSelectionEffect>) {
        let mut next = state.clone();

        let effects = match action {
            ModeSelectionAction::Load => vec![ModeSelectionEffect::LoadMode],

            ModeSelectionAction::Loaded { mode, credentials } => {
                next.loaded = true;
                next.current = mode;
                next.saved_credentials = credentials;
                Vec::new()
            }

            ModeSelectionAction::Select(mode) => match mode {
                AppMode::NotSelected => Vec::new(),
                AppMode::Online => {
                    next.error = None;
                    if !next.dialog.is_open() {
                        next.dialog = CredentialsDialog::open(next.saved_credentials.as_ref());
                    }
                    Vec::new()
                }
                AppMode::Offline | AppMode::Demo => {
                    if next.switching_to.is_some() {
                        Vec::new()
                    } else {
                        next.error = None;
                        next.dialog = CredentialsDialog::Closed;
                        next.switching_to = Some(mode);
                        vec![ModeSelectionEffect::SaveMode(mode)]
                    }
                }
            },

            ModeSelectionAction::EditHost(host) => {
                next.dialog.set_host(host);
                Vec::new()
            }

            ModeSelectionAction::EditToken(token) => {
                next.dialog.set_token(token);
                Vec::new()
            }

            ModeSelectionAction::SubmitCredentials => next
                .dialog
                .submit()
                .map(ModeSelectionEffect::LogIn)
                .into_iter()
                .collect(),

            ModeSelectionAction::ValidationSucceeded(credentials) => {
                next.dialog = CredentialsDialog::Closed;
                next.saved_credentials = Some(credentials);
                next.current = AppMode::Online;
                Vec::new()
            }

            ModeSelectionAction::ValidationFailed(reason) => {
                next.dialog.reject(reason);
                Vec::new()
            }

            ModeSelectionAction::DismissCredentials => {
                if !matches!(next.dialog, CredentialsDialog::Validating { .. }) {
                    next.dialog = CredentialsDialog::Closed;
                }
                Vec::new()
            }

            ModeSelectionAction::ModeSaved(mode) => {
                next.switching_to = None;
                next.current = mode;
                Vec::new()
            }

            ModeSelectionAction::OperationFailed(message) => {
                next.loaded = true;
                next.switching_to = None;
                next.error = Some(message);
                Vec::new()
            }
        };

        (next, effects)
    }
}

pub struct ModeSelectionEffects {
    store: Arc<dyn SettingsStore>,
    validator: Arc<dyn CredentialsValidator>,
    switcher: Arc<dyn ModeSwitcher>,
}

impl ModeSelectionEffects {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        validator: Arc<dyn CredentialsValidator>,
        switcher: Arc<dyn ModeSwitcher>,
    ) -> Self {
        ModeSelectionEffects {
            store,
            validator,
            switcher,
        }
    }
}

fn failed(error: crate::error::MemoTrackError) -> ModeSelectionAction {
    warn!(error = %error, "mode selection failed");
    ModeSelectionAction::OperationFailed(error.to_string())
}

impl EffectHandler for ModeSelectionEffects {
    type Effect = ModeSelectionEffect;
    type Action = ModeSelectionAction;

    fn handle(&self, effect: ModeSelectionEffect) -> BoxStream<'static, ModeSelectionAction> {
        let store = self.store.clone();
        let switcher = self.switcher.clone();

        match effect {
            ModeSelectionEffect::LoadMode => stream::once(async move {
                let mode = match store.load_app_mode().await {
                    Ok(mode) => mode,
                    Err(e) => return failed(e),
                };
                match store.load_credentials().await {
                    Ok(credentials) => ModeSelectionAction::Loaded { mode, credentials },
                    Err(e) => failed(e),
                }
            })
            .boxed(),

            ModeSelectionEffect::SaveMode(mode) => stream::once(async move {
                match store.save_app_mode(mode).await {
                    Ok(()) => {
                        switcher.switch_mode(mode, None);
                        ModeSelectionAction::ModeSaved(mode)
                    }
                    Err(e) => failed(e),
                }
            })
            .boxed(),

            ModeSelectionEffect::LogIn(credentials) => {
                let validator = self.validator.clone();
                stream::once(async move {
                    match log_in(&*validator, &*store, &*switcher, &credentials).await {
                        Ok(()) => ModeSelectionAction::ValidationSucceeded(credentials),
                        Err(e) => {
                            warn!(error = %e, "credential validation failed");
                            ModeSelectionAction::ValidationFailed(e.to_string())
                        }
                    }
                })
                .boxed()
            }
        }
    }
}

pub type ModeSelectionFeature = Feature<ModeSelectionReducer, ModeSelectionEffects>;

pub fn mode_selection_feature(
    store: Arc<dyn SettingsStore>,
    validator: Arc<dyn CredentialsValidator>,
    switcher: Arc<dyn ModeSwitcher>,
) -> ModeSelectionFeature {
    Feature::new(
        ModeSelectionState::default(),
        ModeSelectionReducer,
        ModeSelectionEffects::new(store, validator, switcher),
    )
}
