//! Sound resolution feeding the playback fallback chain.

use chronos::audio::catalog::{DEFAULT_SOUND, SoundCatalog};
use chronos::audio::dispatch::{PlaybackOutcome, SoundDispatcher};
use chronos::audio::playback::{Clip, PlaybackBackend};
use std::sync::{Arc, Mutex};

/// Accepts only the clip kinds it is told to, recording what it played.
struct Recorder {
    name: &'static str,
    accepts_files: bool,
    played: Arc<Mutex<Vec<(&'static str, Clip)>>>,
}

impl PlaybackBackend for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }
    fn is_available(&self) -> bool {
        true
    }
    fn supports(&self, clip: &Clip) -> bool {
        match clip {
            Clip::Tone { .. } => true,
            Clip::File(_) => self.accepts_files,
            Clip::Bell => false,
        }
    }
    fn play(&self, clip: &Clip) -> anyhow::Result<()> {
        self.played.lock().unwrap().push((self.name, clip.clone()));
        Ok(())
    }
}

struct Bell(Arc<Mutex<Vec<(&'static str, Clip)>>>);

impl PlaybackBackend for Bell {
    fn name(&self) -> &'static str {
        "bell"
    }
    fn is_available(&self) -> bool {
        true
    }
    fn is_last_resort(&self) -> bool {
        true
    }
    fn supports(&self, _clip: &Clip) -> bool {
        true
    }
    fn play(&self, clip: &Clip) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(("bell", clip.clone()));
        Ok(())
    }
}

fn dispatcher(
    dir: &tempfile::TempDir,
) -> (SoundDispatcher, Arc<Mutex<Vec<(&'static str, Clip)>>>) {
    let played = Arc::new(Mutex::new(Vec::new()));
    let catalog = Arc::new(SoundCatalog::new(
        dir.path(),
        dir.path().join("builtin"),
        DEFAULT_SOUND,
    ));
    let backends: Vec<Box<dyn PlaybackBackend>> = vec![
        Box::new(Recorder {
            name: "native",
            accepts_files: false,
            played: Arc::clone(&played),
        }),
        Box::new(Recorder {
            name: "external",
            accepts_files: true,
            played: Arc::clone(&played),
        }),
        Box::new(Bell(Arc::clone(&played))),
    ];
    (
        SoundDispatcher::with_backends(catalog, 8_000, backends),
        played,
    )
}

#[test]
fn unknown_sound_plays_default_profile_natively() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, played) = dispatcher(&dir);

    assert_eq!(
        dispatcher.play_once("Does Not Exist"),
        PlaybackOutcome::Played { backend: "native" }
    );
    let played = played.lock().unwrap();
    let Clip::Tone { samples, .. } = &played[0].1 else {
        panic!("expected the default tone");
    };
    // Classic Beep: 0.25 s at 8 kHz.
    assert_eq!(samples.len(), 2_000);
}

#[test]
fn builtin_file_goes_to_external_player() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("builtin")).unwrap();
    let file = dir.path().join("builtin").join("morning_birds.ogg");
    std::fs::write(&file, b"OggS").unwrap();
    let (dispatcher, played) = dispatcher(&dir);

    assert_eq!(
        dispatcher.play_once("Morning Birds"),
        PlaybackOutcome::Played {
            backend: "external"
        }
    );
    assert_eq!(played.lock().unwrap()[0].1, Clip::File(file));
}

#[test]
fn missing_custom_file_falls_back_to_bell() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, played) = dispatcher(&dir);
    dispatcher
        .catalog()
        .add_custom_sound("Lost", "lost.mp3", "deleted by hand")
        .unwrap();

    assert_eq!(
        dispatcher.play_once("Lost"),
        PlaybackOutcome::Played { backend: "bell" }
    );
    assert_eq!(played.lock().unwrap()[0].1, Clip::Bell);
}
