//! Pipeline stage notifications.

use std::fmt;
use tracing::debug;

/// Pipeline checkpoints, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CanvasAllocated,
    BackgroundFilled,
    TextDrawn,
    Distorted,
    EffectsApplied,
    Resampled,
    Encoded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CanvasAllocated => "canvas allocated",
            Self::BackgroundFilled => "background filled",
            Self::TextDrawn => "text drawn",
            Self::Distorted => "distorted",
            Self::EffectsApplied => "effects applied",
            Self::Resampled => "resampled",
            Self::Encoded => "encoded",
        };
        f.write_str(name)
    }
}

/// Receives a message after each stage completes.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, stage: Stage, detail: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _stage: Stage, _detail: &str) {}
}

/// Forwards notifications to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage(&self, stage: Stage, detail: &str) {
        debug!(stage = %stage, "{detail}");
    }
}
