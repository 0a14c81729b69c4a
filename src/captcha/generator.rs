//! CAPTCHA generation and verification entry points.

use crate::captcha::answer::random_answer;
use crate::captcha::canvas::{Canvas, OVERSIZE_FACTOR};
use crate::captcha::distort::{WaveParams, distort};
use crate::captcha::effects::apply_effects;
use crate::captcha::encode::{EncodedImage, encode};
use crate::captcha::font::FontLoader;
use crate::captcha::observer::{NoopObserver, Stage, StageObserver};
use crate::captcha::render::GlyphRenderer;
use crate::captcha::resample::resample;
use crate::config::{CaptchaConfig, CaptchaError, Result};
use crate::store::VerificationStore;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, info};

/// Store key holding the expected answer.
pub const SESSION_KEY: &str = "cwscaptcha";

/// One finished run: the answer and its rendered image.
#[derive(Debug, Clone)]
pub struct Captcha {
    pub answer: String,
    pub image: EncodedImage,
}

/// Runs the drawing pipeline; holds no per-run state.
pub struct CaptchaGenerator {
    fonts: Arc<dyn FontLoader>,
    observer: Arc<dyn StageObserver>,
}

impl CaptchaGenerator {
    #[must_use]
    pub fn new(fonts: Arc<dyn FontLoader>) -> Self {
        Self {
            fonts,
            observer: Arc::new(NoopObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Renders a fresh CAPTCHA and records its answer under [`SESSION_KEY`].
    ///
    /// The store is written only once the image is encoded.
    ///
    /// # Errors
    ///
    /// Any pipeline failure; nothing is stored in that case.
    pub fn process(
        &self,
        config: &CaptchaConfig,
        store: &dyn VerificationStore,
    ) -> Result<EncodedImage> {
        self.process_with_rng(config, store, &mut rand::rng())
    }

    /// [`Self::process`] with a caller supplied random source.
    ///
    /// # Errors
    ///
    /// Any pipeline failure; nothing is stored in that case.
    pub fn process_with_rng<R: Rng + ?Sized>(
        &self,
        config: &CaptchaConfig,
        store: &dyn VerificationStore,
        rng: &mut R,
    ) -> Result<EncodedImage> {
        let Captcha { answer, image } = self.generate(config, rng)?;
        store.write(SESSION_KEY, answer);
        Ok(image)
    }

    /// Renders a CAPTCHA without touching any store.
    ///
    /// # Errors
    ///
    /// `InvalidConfig`/`InvalidColor` before drawing starts, then
    /// `FontLoad`, `Allocation` or `Encoding` from the stage that failed.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        config: &CaptchaConfig,
        rng: &mut R,
    ) -> Result<Captcha> {
        let palette = config.validate()?;
        let color = *palette
            .foreground
            .choose(rng)
            .ok_or_else(|| CaptchaError::InvalidConfig("foreground palette is empty".into()))?;
        let answer = random_answer(rng, config.min_length, config.max_length)?;
        let font = config
            .fonts
            .choose(rng)
            .ok_or_else(|| CaptchaError::InvalidConfig("font catalogue is empty".into()))?;
        let glyphs = self.fonts.load(font)?;

        let mut canvas = Canvas::allocate(
            config.width * OVERSIZE_FACTOR,
            config.height * OVERSIZE_FACTOR,
            config.transparent,
        )?;
        self.notify(Stage::CanvasAllocated, || {
            format!("{}x{}", canvas.width(), canvas.height())
        });

        canvas.fill(palette.background);
        self.notify(Stage::BackgroundFilled, || format!("{:?}", palette.background.0));

        let renderer = GlyphRenderer::new(
            glyphs.as_ref(),
            font,
            color,
            config.max_rotation,
            config.max_length,
        );
        let pen_x = renderer.draw(&mut canvas, &answer, config.height, rng);
        self.notify(Stage::TextDrawn, || {
            format!("font={} len={} pen_x={pen_x:.1}", font.resource, answer.len())
        });

        let wave = WaveParams::random(rng, config.period, config.amplitude);
        distort(&mut canvas, &wave);
        self.notify(Stage::Distorted, || format!("{wave:?}"));

        apply_effects(&mut canvas, config.effects, config.pixelate_block);
        self.notify(Stage::EffectsApplied, || format!("{:?}", config.effects));

        let canvas = resample(canvas, config.width, config.height)?;
        self.notify(Stage::Resampled, || {
            format!("{}x{}", canvas.width(), canvas.height())
        });

        let image = encode(&canvas, config.format)?;
        self.notify(Stage::Encoded, || {
            format!("{} bytes as {}", image.bytes.len(), image.content_type())
        });

        info!(
            len = answer.len(),
            font = %font.resource,
            content_type = image.content_type(),
            "CAPTCHA generated"
        );
        Ok(Captcha { answer, image })
    }

    fn notify(&self, stage: Stage, detail: impl FnOnce() -> String) {
        self.observer.on_stage(stage, &detail());
    }
}

/// Compares `candidate` with the stored answer, ignoring case.
///
/// False when nothing has been stored.
#[must_use]
pub fn check(store: &dyn VerificationStore, candidate: &str) -> bool {
    let Some(expected) = store.read(SESSION_KEY) else {
        debug!("No stored answer to check against");
        return false;
    };
    expected.to_lowercase() == candidate.to_lowercase()
}
