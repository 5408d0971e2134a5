use clap::Parser;
use memotrack::application::{
    EditorState, HabitsAction, HabitsFeature, HabitsState, ModeSelectionAction, ResetState,
    SettingsAction, SettingsStore,
};
use memotrack::cli::context::check_error;
use memotrack::cli::output::format_day_statuses;
use memotrack::cli::{
    format_activity, format_feed, format_habit_list, format_settings, parse_day, AppContext, Cli,
    Commands,
};
use memotrack::domain::habits::{normalize_habit_tag, parse_habit_config_line, HabitConfig};
use memotrack::domain::{
    activity_week_data_for_habit, calculate_success_rate, ActivityDisplayMode, AppMode, Theme,
    TimeRangeTab,
};
use memotrack::error::{MemoTrackError, Result};
use memotrack::infrastructure::MemosRepository;
use memotrack::logging;
use std::str::FromStr;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("memotrack - Habit tracking on top of your memos");
        println!("Use --help for usage information");
        return Ok(());
    };

    let ctx = AppContext::open().await?;

    match command {
        Commands::Mode { mode } => match mode {
            Some(mode) => switch_mode(&ctx, &mode).await,
            None => {
                println!("{}", ctx.repository.mode());
                Ok(())
            }
        },
        Commands::Login { host, token } => log_in(&ctx, host, token).await,
        Commands::Feed { limit } => {
            ctx.require_mode()?;
            let memos = ctx.repository.load_memos().await?;
            let shown = &memos[..limit.min(memos.len())];
            emit(format_feed(shown, &ctx.clock.offset()));
            Ok(())
        }
        Commands::Post { text } => post(&ctx, text.join(" ")).await,
        Commands::Habits {
            range,
            offset,
            posts,
            habit,
            list,
        } => show_habits(&ctx, range, offset, posts, habit, list).await,
        Commands::Check { date, tags, yes } => check_day(&ctx, &date, &tags, yes).await,
        Commands::ConfigHabits { lines } => configure_habits(&ctx, &lines).await,
        Commands::Settings {
            theme,
            language,
            tab,
        } => update_settings(&ctx, theme, language, tab).await,
        Commands::Reset { yes } => reset(&ctx, yes).await,
    }
}

/// Print a block of output with exactly one trailing newline
fn emit(text: String) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

async fn switch_mode(ctx: &AppContext, input: &str) -> Result<()> {
    let mode = AppMode::from_str(input).map_err(MemoTrackError::Config)?;
    if mode == AppMode::NotSelected {
        return Err(MemoTrackError::Config(format!("Invalid mode: {}", input)));
    }

    let feature = ctx.mode_selection();
    feature.send(ModeSelectionAction::Load);
    let state = feature.wait_for(|s| s.loaded).await?;
    check_error(&state.error)?;

    if mode == AppMode::Online && state.saved_credentials.is_none() {
        return Err(MemoTrackError::InvalidCredentials(
            "no saved server credentials".to_string(),
        ));
    }

    feature.send(ModeSelectionAction::Select(mode));
    if mode == AppMode::Online {
        // Saved credentials are re-validated before going online
        feature.send(ModeSelectionAction::SubmitCredentials);
    }

    let state = feature.wait_for(|s| s.is_settled()).await?;
    check_error(&state.error)?;
    if let Some(reason) = state.dialog.error() {
        return Err(MemoTrackError::InvalidCredentials(reason.to_string()));
    }

    println!("Switched to {} mode", state.current);
    Ok(())
}

async fn log_in(ctx: &AppContext, host: String, token: String) -> Result<()> {
    let feature = ctx.mode_selection();
    feature.send(ModeSelectionAction::Load);
    feature.wait_for(|s| s.loaded).await?;

    feature.send(ModeSelectionAction::Select(AppMode::Online));
    feature.send(ModeSelectionAction::EditHost(host));
    feature.send(ModeSelectionAction::EditToken(token));
    feature.send(ModeSelectionAction::SubmitCredentials);

    let state = feature.wait_for(|s| s.is_settled()).await?;
    if let Some(reason) = state.dialog.error() {
        return Err(MemoTrackError::InvalidCredentials(reason.to_string()));
    }
    check_error(&state.error)?;

    match &state.saved_credentials {
        Some(credentials) if state.current == AppMode::Online => {
            println!("Logged in to {}", credentials.base_url());
            Ok(())
        }
        _ => Err(MemoTrackError::InvalidCredentials(
            "login did not complete".to_string(),
        )),
    }
}

/// Wait until the habit tracker is idle, surfacing any error it recorded
async fn settle(feature: &HabitsFeature) -> Result<HabitsState> {
    let state = feature
        .wait_for(|s| s.error.is_some() || (s.snapshot.is_some() && s.is_settled()))
        .await?;
    check_error(&state.error)?;
    Ok(state)
}

async fn load_habits(ctx: &AppContext, tab: TimeRangeTab) -> Result<HabitsFeature> {
    ctx.require_mode()?;
    let feature = ctx.habits(tab);
    feature.send(HabitsAction::Load);
    settle(&feature).await?;
    Ok(feature)
}

/// Match a habit by tag or by label, case-insensitively
fn find_habit<'a>(habits: &'a [HabitConfig], query: &str) -> Result<&'a HabitConfig> {
    let tag = normalize_habit_tag(query);
    habits
        .iter()
        .find(|h| Some(&h.tag) == tag.as_ref() || h.label.eq_ignore_ascii_case(query.trim()))
        .ok_or_else(|| {
            let known: Vec<&str> = habits.iter().map(|h| h.label.as_str()).collect();
            MemoTrackError::Validation(format!(
                "Unknown habit '{}'. Configured habits: {}",
                query,
                known.join(", ")
            ))
        })
}

async fn post(ctx: &AppContext, content: String) -> Result<()> {
    ctx.require_mode()?;
    let feature = ctx.habits(TimeRangeTab::Week);
    feature.send(HabitsAction::CreatePost(content));
    let state = feature
        .wait_for(|s| s.error.is_some() || s.last_post.is_some())
        .await?;
    check_error(&state.error)?;

    if let Some(name) = &state.last_post {
        println!("Created {}", name);
    }
    Ok(())
}

async fn show_habits(
    ctx: &AppContext,
    range: Option<String>,
    offset: i32,
    posts: bool,
    habit: Option<String>,
    list: bool,
) -> Result<()> {
    let tab = match range {
        Some(range) => TimeRangeTab::from_str(&range).map_err(MemoTrackError::InvalidRange)?,
        None => ctx.store.load_preferences().await?.time_range_tab,
    };
    if offset > 0 {
        return Err(MemoTrackError::InvalidRange(
            "only the current or past periods can be shown".to_string(),
        ));
    }

    let feature = load_habits(ctx, tab).await?;

    if list {
        emit(format_habit_list(&feature.state().current_habits()));
        return Ok(());
    }

    if offset != 0 {
        if feature.state().range.shift(offset).is_none() {
            return Err(MemoTrackError::InvalidRange(format!(
                "offset {} is outside the calendar",
                offset
            )));
        }
        feature.send(HabitsAction::ShiftRange(offset));
    }
    if posts {
        feature.send(HabitsAction::SetDisplayMode(ActivityDisplayMode::Posts));
    }
    let state = settle(&feature).await?;

    let Some(activity) = state.current_activity() else {
        return Err(MemoTrackError::Background(
            "activity was not computed".to_string(),
        ));
    };

    match habit {
        Some(query) if state.display_mode == ActivityDisplayMode::Habits => {
            let habits = state.current_habits();
            let selected = find_habit(&habits, &query)?;
            let data = activity_week_data_for_habit(&activity.week_data, &selected.tag);
            let config_start = state.snapshot.as_ref().and_then(|s| s.config_start_date());
            let rate = calculate_success_rate(&data, state.range, state.today, config_start);
            println!("{}", selected.label);
            print!(
                "{}",
                format_activity(&state.range, state.display_mode, &data, &rate, state.today)
            );
        }
        _ => print!(
            "{}",
            format_activity(
                &state.range,
                state.display_mode,
                &activity.week_data,
                &activity.success_rate,
                state.today,
            )
        ),
    }
    Ok(())
}

async fn check_day(ctx: &AppContext, date: &str, tags: &[String], yes: bool) -> Result<()> {
    let feature = load_habits(ctx, TimeRangeTab::Week).await?;
    let date = parse_day(date, feature.state().today)?;

    feature.send(HabitsAction::OpenEditor(date));
    let state = feature.state();
    check_error(&state.error)?;
    let Some(editor) = state.editor.editor() else {
        return Err(MemoTrackError::Validation(format!(
            "Could not open the habit log for {}",
            date
        )));
    };

    let mut wanted = Vec::new();
    for query in tags {
        wanted.push(find_habit(&editor.habits, query)?.tag.clone());
    }
    for (tag, selected) in &editor.selections {
        if *selected != wanted.contains(tag) {
            feature.send(HabitsAction::ToggleHabit(tag.clone()));
        }
    }

    feature.send(HabitsAction::ConfirmEditor);
    match feature.state().editor {
        EditorState::DeleteConfirmPending(_) if yes => feature.send(HabitsAction::ConfirmDelete),
        EditorState::DeleteConfirmPending(_) => {
            feature.send(HabitsAction::CancelDelete);
            feature.send(HabitsAction::CloseEditor);
            return Err(MemoTrackError::Validation(format!(
                "No habits given: pass --yes to delete the log for {}",
                date
            )));
        }
        EditorState::Open(editor) => {
            return Err(MemoTrackError::Validation(
                editor
                    .error
                    .unwrap_or_else(|| "Nothing to save".to_string()),
            ))
        }
        _ => {}
    }

    let state = feature
        .wait_for(|s| s.error.is_some() || (s.editor == EditorState::Closed && s.is_settled()))
        .await?;
    check_error(&state.error)?;

    if wanted.is_empty() {
        println!("Deleted habit log for {}", date);
        return Ok(());
    }

    println!("Logged {}/{} habits for {}", wanted.len(), editor.habits.len(), date);
    let day = state
        .current_activity()
        .and_then(|activity| activity.week_data.day(date).cloned());
    if let Some(day) = day {
        print!("{}", format_day_statuses(&day));
    }
    Ok(())
}

async fn configure_habits(ctx: &AppContext, lines: &[String]) -> Result<()> {
    let mut habits = Vec::new();
    for line in lines {
        let habit = parse_habit_config_line(line).ok_or_else(|| {
            MemoTrackError::Validation(format!(
                "Invalid habit line '{}': use 'Label | #habits/tag | #RRGGBB'",
                line
            ))
        })?;
        if habits.iter().any(|h: &HabitConfig| h.tag == habit.tag) {
            return Err(MemoTrackError::Validation(format!(
                "Habit {} is listed twice",
                habit.tag
            )));
        }
        habits.push(habit);
    }

    let feature = load_habits(ctx, TimeRangeTab::Week).await?;
    let generation = feature.state().generation;
    feature.send(HabitsAction::SaveHabitsConfig(habits));
    let state = feature
        .wait_for(|s| s.error.is_some() || (s.generation > generation && s.is_settled()))
        .await?;
    check_error(&state.error)?;

    println!("Saved habit configuration");
    emit(format_habit_list(&state.current_habits()));
    Ok(())
}

async fn update_settings(
    ctx: &AppContext,
    theme: Option<String>,
    language: Option<String>,
    tab: Option<String>,
) -> Result<()> {
    let theme = theme
        .map(|t| Theme::from_str(&t).map_err(MemoTrackError::Config))
        .transpose()?;
    let tab = tab
        .map(|t| TimeRangeTab::from_str(&t).map_err(MemoTrackError::InvalidRange))
        .transpose()?;

    let feature = ctx.settings();
    feature.send(SettingsAction::Load);
    let state = feature.wait_for(|s| s.loaded).await?;
    check_error(&state.error)?;

    if let Some(theme) = theme {
        feature.send(SettingsAction::SetTheme(theme));
    }
    if let Some(language) = language {
        let language = language.trim();
        let language = if language.is_empty() || language.eq_ignore_ascii_case("system") {
            None
        } else {
            Some(language.to_string())
        };
        feature.send(SettingsAction::SetLanguage(language));
    }
    if let Some(tab) = tab {
        feature.send(SettingsAction::SetTimeRangeTab(tab));
    }

    let state = feature.wait_for(|s| s.is_settled()).await?;
    check_error(&state.error)?;
    print!("{}", format_settings(&state));
    Ok(())
}

async fn reset(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        return Err(MemoTrackError::Validation(
            "Reset forgets credentials, mode and preferences: pass --yes to confirm".to_string(),
        ));
    }

    let feature = ctx.settings();
    feature.send(SettingsAction::Load);
    feature.wait_for(|s| s.loaded).await?;

    feature.send(SettingsAction::RequestReset);
    feature.send(SettingsAction::ConfirmReset);
    let state = feature
        .wait_for(|s| s.reset == ResetState::Done || s.reset == ResetState::Idle)
        .await?;
    check_error(&state.error)?;

    println!("Reset complete. Offline memos in {} were kept", ctx.data_dir.display());
    Ok(())
}
