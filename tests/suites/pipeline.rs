use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use wavecaptcha::captcha::{Stage, StageObserver};
use wavecaptcha::test_utils::{BlockFontLoader, test_config};
use wavecaptcha::{
    CaptchaConfig, CaptchaError, CaptchaGenerator, FontDirectory, MemoryStore, OutputFormat,
    SESSION_KEY, SessionStore, VerificationStore, check,
};

struct CountingObserver(AtomicUsize);

impl StageObserver for CountingObserver {
    fn on_stage(&self, _stage: Stage, detail: &str) {
        assert!(!detail.is_empty());
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_default_sized_png_round_trip() {
    let generator = CaptchaGenerator::new(Arc::new(BlockFontLoader));
    let store = MemoryStore::new();
    let image = generator.process(&test_config(), &store).unwrap();

    assert_eq!(image.content_type(), "image/png");
    let decoded = image::load_from_memory(&image.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (250, 60));

    let answer = store.read(SESSION_KEY).unwrap();
    assert_eq!(answer.len(), 6);
    assert!(check(&store, &answer.to_uppercase()));
    assert!(!check(&store, &answer[..5]));
}

#[test]
fn test_all_effects_and_custom_size() {
    let config = CaptchaConfig {
        width: 173,
        height: 47,
        min_length: 3,
        max_length: 9,
        effects: wavecaptcha::config::Effects {
            blur: true,
            emboss: true,
            pixelate: true,
        },
        format: OutputFormat::Jpeg,
        ..test_config()
    };
    let generator = CaptchaGenerator::new(Arc::new(BlockFontLoader));
    let store = MemoryStore::new();
    let image = generator.process(&config, &store).unwrap();

    assert_eq!(image.content_type(), "image/jpeg");
    let decoded = image::load_from_memory(&image.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (173, 47));
    let len = store.read(SESSION_KEY).unwrap().len();
    assert!((3..=9).contains(&len));
}

#[test]
fn test_observer_receives_each_stage() {
    let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
    let generator =
        CaptchaGenerator::new(Arc::new(BlockFontLoader)).with_observer(observer.clone());
    generator.process(&test_config(), &MemoryStore::new()).unwrap();
    assert_eq!(observer.0.load(Ordering::SeqCst), 7);
}

#[test]
fn test_font_directory_failure_is_fatal() {
    let generator = CaptchaGenerator::new(Arc::new(FontDirectory::new(
        "/nonexistent/wavecaptcha-fonts",
    )));
    let store = MemoryStore::new();
    let err = generator
        .process(&CaptchaConfig::default(), &store)
        .unwrap_err();

    assert!(matches!(err, CaptchaError::FontLoad { .. }));
    assert!(!check(&store, ""));
}

#[test]
fn test_concurrent_sessions_are_independent() {
    let generator = Arc::new(CaptchaGenerator::new(Arc::new(BlockFontLoader)));
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let generator = generator.clone();
            let sessions = sessions.clone();
            thread::spawn(move || {
                let scope = sessions.scope(&format!("session-{i}"));
                generator.process(&test_config(), &scope).unwrap();
                scope.read(SESSION_KEY).unwrap()
            })
        })
        .collect();
    let answers: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(sessions.len(), 4);
    for (i, answer) in answers.iter().enumerate() {
        let scope = sessions.scope(&format!("session-{i}"));
        assert!(check(&scope, answer));
    }
}
