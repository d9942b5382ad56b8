//! Integration tests for the playback controller
//!
//! Cover list precedence, navigation scenarios, auto-advance after
//! completion and persistence of preferences.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use riyue_playback::test_utils::{EventRecorder, ScriptedBackend};
use riyue_playback::{
    Advance, BackendError, ListView, MemorySettings, NavOutcome, NextTrigger, PlayMode,
    PlayQueueNavigator, PlaybackConfig, PlaybackController, PlaybackError, PlaybackSettings,
    PlaybackStatus, SingleLoopSkip, Track, TrackList,
};

// ===== Test Helpers =====

/// Settings whose state stays observable after being handed to the controller
#[derive(Clone, Default)]
struct SharedSettings(Arc<Mutex<MemorySettings>>);

impl SharedSettings {
    fn with(play_mode: i32, volume: i32) -> Self {
        Self(Arc::new(Mutex::new(MemorySettings {
            play_mode,
            volume,
            last_played: None,
        })))
    }

    fn snapshot(&self) -> MemorySettings {
        self.0.lock().unwrap().clone()
    }
}

impl PlaybackSettings for SharedSettings {
    fn play_mode(&self) -> i32 {
        self.0.lock().unwrap().play_mode()
    }

    fn set_play_mode(&mut self, mode: i32) {
        self.0.lock().unwrap().set_play_mode(mode);
    }

    fn volume(&self) -> i32 {
        self.0.lock().unwrap().volume()
    }

    fn set_volume(&mut self, volume: i32) {
        self.0.lock().unwrap().set_volume(volume);
    }

    fn set_last_played(&mut self, track_id: i64) {
        self.0.lock().unwrap().set_last_played(track_id);
    }
}

fn tracks(ids: &[i64]) -> TrackList {
    ids.iter()
        .map(|&id| Track {
            duration: Some("3:00".to_string()),
            file_url: Some(format!("/srv/uploads/{id}.mp3")),
            ..Track::new(id, format!("Track {id}"))
        })
        .collect::<Vec<_>>()
        .into()
}

struct Fixture {
    controller: PlaybackController,
    backend: ScriptedBackend,
    settings: SharedSettings,
    recorder: EventRecorder,
}

fn fixture_with(settings: SharedSettings, config: PlaybackConfig) -> Fixture {
    let backend = ScriptedBackend::new();
    let mut controller = PlaybackController::with_navigator(
        backend.boxed(),
        Box::new(settings.clone()),
        config,
        "http://music.local:8080",
        PlayQueueNavigator::with_rng(StdRng::seed_from_u64(42)),
    );
    let (recorder, _) = EventRecorder::attach(controller.engine_mut());
    Fixture {
        controller,
        backend,
        settings,
        recorder,
    }
}

fn fixture(play_mode: PlayMode) -> Fixture {
    fixture_with(
        SharedSettings::with(play_mode.to_setting(), 80),
        PlaybackConfig::default(),
    )
}

fn playing_id(controller: &PlaybackController) -> Option<i64> {
    controller.engine().current_track().map(|track| track.id)
}

// ===== Active list =====

#[test]
fn playlist_view_wins_over_catalog() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.open_playlist(tracks(&[10, 20, 30]));

    f.controller.play_at(ListView::Playlist, 0).unwrap();
    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::Play(1)
    );
    assert_eq!(playing_id(&f.controller), Some(20));
    assert_eq!(f.controller.catalog().unwrap().current_index(), None);
}

#[test]
fn catalog_drives_navigation_after_playlist_closes() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    f.controller.open_playlist(tracks(&[10, 20]));
    f.controller.close_playlist();

    f.controller.next(NextTrigger::Explicit).unwrap();
    assert_eq!(playing_id(&f.controller), Some(2));
}

#[test]
fn unfocused_catalog_is_not_navigated() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();
    f.controller.focus_catalog(false);

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::NothingToPlay
    );
    assert_eq!(playing_id(&f.controller), Some(1));
    assert_eq!(f.controller.engine().status(), PlaybackStatus::Playing);
}

#[test]
fn fresh_playlist_starts_from_first_track() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 2).unwrap();
    f.controller.open_playlist(tracks(&[10, 20]));

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::Play(0)
    );
    assert_eq!(playing_id(&f.controller), Some(10));
}

#[test]
fn empty_active_list_changes_nothing() {
    let mut f = fixture(PlayMode::ListLoop);
    f.controller.set_catalog(tracks(&[1]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();
    f.controller.open_playlist(TrackList::default());

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::NothingToPlay
    );
    assert_eq!(
        f.controller.previous().unwrap(),
        NavOutcome::NothingToPlay
    );
    assert_eq!(playing_id(&f.controller), Some(1));
}

// ===== Navigation scenarios =====

#[test]
fn list_loop_next_from_last_wraps_to_first() {
    let mut f = fixture(PlayMode::ListLoop);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 2).unwrap();

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::Play(0)
    );
    assert_eq!(playing_id(&f.controller), Some(1));
}

#[test]
fn normal_single_track_reports_end_of_list() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::EndOfList
    );
}

#[test]
fn shuffle_two_tracks_picks_the_other() {
    let mut f = fixture(PlayMode::Shuffle);
    f.controller.set_catalog(tracks(&[1, 2]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::Play(1)
    );
    assert_eq!(playing_id(&f.controller), Some(2));
}

#[test]
fn previous_at_first_track_clamps_or_wraps() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    assert_eq!(f.controller.previous().unwrap(), NavOutcome::Play(0));
    assert_eq!(playing_id(&f.controller), Some(1));

    f.controller.set_play_mode(PlayMode::ListLoop);
    assert_eq!(f.controller.previous().unwrap(), NavOutcome::Play(2));
    assert_eq!(playing_id(&f.controller), Some(3));
}

#[test]
fn single_loop_advance_policy_skips_forward() {
    let config = PlaybackConfig {
        single_loop_skip: SingleLoopSkip::Advance,
        ..PlaybackConfig::default()
    };
    let mut f = fixture_with(SharedSettings::with(3, 80), config);
    f.controller.set_catalog(tracks(&[1, 2]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    assert_eq!(
        f.controller.next(NextTrigger::Explicit).unwrap(),
        NavOutcome::Play(1)
    );
    assert_eq!(playing_id(&f.controller), Some(2));
}

#[test]
fn failed_load_surfaces_backend_error() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2]));
    f.backend
        .fail_next_open(BackendError::Open("unsupported codec".into()));

    let err = f.controller.play_at(ListView::Catalog, 1).unwrap_err();

    assert!(matches!(err, PlaybackError::Backend { .. }));
    assert_eq!(f.controller.engine().status(), PlaybackStatus::Stopped);
    assert_eq!(f.settings.snapshot().last_played, None);
}

#[test]
fn track_without_file_is_rejected_before_loading() {
    let mut f = fixture(PlayMode::Normal);
    f.controller
        .set_catalog(TrackList::new(vec![Track::new(7, "No file")]));

    assert!(matches!(
        f.controller.play_at(ListView::Catalog, 0),
        Err(PlaybackError::MissingStreamUrl { track_id: 7 })
    ));
    assert!(f.backend.opened_urls().is_empty());
}

#[test]
fn out_of_range_index_is_rejected() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2]));

    assert!(matches!(
        f.controller.play_at(ListView::Catalog, 5),
        Err(PlaybackError::IndexOutOfBounds { index: 5, len: 2 })
    ));
}

// ===== Auto-advance =====

#[test]
fn completion_advances_to_next_track() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();

    f.backend.report_end();
    let advance = f.controller.process_pending_notices().unwrap();

    assert_eq!(advance, Some(Advance::Navigated(NavOutcome::Play(1))));
    assert_eq!(playing_id(&f.controller), Some(2));
    assert_eq!(f.controller.engine().status(), PlaybackStatus::Playing);
    assert_eq!(
        f.backend.opened_urls().last().map(String::as_str),
        Some("http://music.local:8080/api/files/music/2.mp3")
    );
}

#[test]
fn completion_at_end_of_list_stops() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[1, 2]));
    f.controller.play_at(ListView::Catalog, 1).unwrap();

    f.backend.set_position(180_000);
    let advance = f.controller.tick().unwrap();

    assert_eq!(advance, Some(Advance::Navigated(NavOutcome::EndOfList)));
    assert_eq!(f.controller.engine().status(), PlaybackStatus::Stopped);
    assert!(f.controller.engine().current_track().is_none());
    assert_eq!(f.recorder.finished_count(), 1);
}

#[test]
fn single_loop_completion_replays_same_track() {
    let mut f = fixture(PlayMode::SingleLoop);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 1).unwrap();

    // Another view opened meanwhile must not matter for a repeat
    f.controller.open_playlist(tracks(&[10]));
    f.backend.report_end();
    let advance = f.controller.process_pending_notices().unwrap();

    assert_eq!(advance, Some(Advance::Repeated));
    assert_eq!(playing_id(&f.controller), Some(2));
    assert_eq!(f.controller.engine().status(), PlaybackStatus::Playing);
    assert_eq!(f.backend.opened_urls().len(), 2);
}

#[test]
fn double_completion_advances_once() {
    let mut f = fixture(PlayMode::ListLoop);
    f.controller.set_catalog(tracks(&[1, 2, 3]));
    f.controller.play_at(ListView::Catalog, 0).unwrap();
    let stale = f.backend.notifier().unwrap();

    f.backend.set_position(180_000);
    assert!(f.controller.tick().unwrap().is_some());
    assert_eq!(playing_id(&f.controller), Some(2));

    // The end notice of the finished load arrives late
    stale.end_reached();
    assert_eq!(f.controller.process_pending_notices().unwrap(), None);
    assert_eq!(playing_id(&f.controller), Some(2));
    assert_eq!(f.recorder.finished_count(), 1);
}

// ===== Preferences =====

#[test]
fn persisted_preferences_are_applied_at_startup() {
    let f = fixture_with(SharedSettings::with(2, 45), PlaybackConfig::default());

    assert_eq!(f.controller.play_mode(), PlayMode::Shuffle);
    assert_eq!(f.controller.volume(), 45);
    assert_eq!(f.backend.current_volume(), 45);
}

#[test]
fn invalid_persisted_mode_falls_back_to_normal() {
    let f = fixture_with(SharedSettings::with(9, 80), PlaybackConfig::default());
    assert_eq!(f.controller.play_mode(), PlayMode::Normal);
}

#[test]
fn preference_changes_are_persisted() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_play_mode(PlayMode::SingleLoop);
    f.controller.set_volume(150);

    let saved = f.settings.snapshot();
    assert_eq!(saved.play_mode, 3);
    assert_eq!(saved.volume, 100);

    assert!(f.controller.toggle_mute());
    assert_eq!(f.settings.snapshot().volume, 100);
}

#[test]
fn last_played_is_recorded() {
    let mut f = fixture(PlayMode::Normal);
    f.controller.set_catalog(tracks(&[5, 6]));
    f.controller.play_at(ListView::Catalog, 1).unwrap();

    assert_eq!(f.settings.snapshot().last_played, Some(6));
}
