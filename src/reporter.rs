use std::time::Instant;

use crate::float::Float;
use crate::spectrum::Spectrum;
use crate::vec2d::Vec2d;

/// Partial radiance image a renderer can produce on demand for
/// interactive consumers.
pub type PreviewImage = Vec2d<Spectrum>;

pub trait ReporterI {
    fn begin(&mut self);

    /// Starts a named stage; progress restarts from zero.
    fn new_stage(&mut self, name: &str);

    /// Whether `progress` calls should carry a preview producer.
    /// Producing a preview copies the whole image, so renderers skip it
    /// unless asked.
    fn need_image_preview(&self) -> bool {
        false
    }

    /// `percent` is in `[0, 100]`.
    fn progress(&mut self, percent: Float, preview: Option<&dyn Fn() -> PreviewImage>);

    fn message(&mut self, msg: &str);

    fn error(&mut self, err: &str);

    fn end_stage(&mut self);

    fn end(&mut self);

    /// Wall-clock seconds between `begin` and `end`.
    fn total_seconds(&self) -> Float;
}

pub enum Reporter {
    Log(LogReporter),
    Silent(SilentReporter),
}

impl ReporterI for Reporter {
    fn begin(&mut self) {
        match self {
            Reporter::Log(r) => r.begin(),
            Reporter::Silent(r) => r.begin(),
        }
    }

    fn new_stage(&mut self, name: &str) {
        match self {
            Reporter::Log(r) => r.new_stage(name),
            Reporter::Silent(r) => r.new_stage(name),
        }
    }

    fn need_image_preview(&self) -> bool {
        match self {
            Reporter::Log(r) => r.need_image_preview(),
            Reporter::Silent(r) => r.need_image_preview(),
        }
    }

    fn progress(&mut self, percent: Float, preview: Option<&dyn Fn() -> PreviewImage>) {
        match self {
            Reporter::Log(r) => r.progress(percent, preview),
            Reporter::Silent(r) => r.progress(percent, preview),
        }
    }

    fn message(&mut self, msg: &str) {
        match self {
            Reporter::Log(r) => r.message(msg),
            Reporter::Silent(r) => r.message(msg),
        }
    }

    fn error(&mut self, err: &str) {
        match self {
            Reporter::Log(r) => r.error(err),
            Reporter::Silent(r) => r.error(err),
        }
    }

    fn end_stage(&mut self) {
        match self {
            Reporter::Log(r) => r.end_stage(),
            Reporter::Silent(r) => r.end_stage(),
        }
    }

    fn end(&mut self) {
        match self {
            Reporter::Log(r) => r.end(),
            Reporter::Silent(r) => r.end(),
        }
    }

    fn total_seconds(&self) -> Float {
        match self {
            Reporter::Log(r) => r.total_seconds(),
            Reporter::Silent(r) => r.total_seconds(),
        }
    }
}

/// Reports through the `log` crate, emitting a line whenever progress
/// advances by at least one percent.
pub struct LogReporter {
    started: Option<Instant>,
    finished_seconds: Float,
    stage: String,
    last_logged_percent: i32,
}

impl LogReporter {
    pub fn new() -> LogReporter {
        LogReporter {
            started: None,
            finished_seconds: 0.0,
            stage: String::new(),
            last_logged_percent: -1,
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        LogReporter::new()
    }
}

impl ReporterI for LogReporter {
    fn begin(&mut self) {
        self.started = Some(Instant::now());
        self.finished_seconds = 0.0;
    }

    fn new_stage(&mut self, name: &str) {
        self.stage = name.to_string();
        self.last_logged_percent = -1;
        log::info!("stage: {}", name);
    }

    fn progress(&mut self, percent: Float, _preview: Option<&dyn Fn() -> PreviewImage>) {
        let whole = percent.floor() as i32;
        if whole > self.last_logged_percent {
            self.last_logged_percent = whole;
            log::info!("{}: {:5.1}%", self.stage, percent);
        }
    }

    fn message(&mut self, msg: &str) {
        log::info!("{}", msg);
    }

    fn error(&mut self, err: &str) {
        log::error!("{}", err);
    }

    fn end_stage(&mut self) {
        self.progress(100.0, None);
    }

    fn end(&mut self) {
        if let Some(t) = self.started {
            self.finished_seconds = t.elapsed().as_secs_f64() as Float;
        }
        log::info!("finished in {:.2}s", self.finished_seconds);
    }

    fn total_seconds(&self) -> Float {
        self.finished_seconds
    }
}

/// Discards everything except timing.
pub struct SilentReporter {
    started: Option<Instant>,
    finished_seconds: Float,
}

impl SilentReporter {
    pub fn new() -> SilentReporter {
        SilentReporter {
            started: None,
            finished_seconds: 0.0,
        }
    }
}

impl Default for SilentReporter {
    fn default() -> Self {
        SilentReporter::new()
    }
}

impl ReporterI for SilentReporter {
    fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    fn new_stage(&mut self, _name: &str) {}

    fn progress(&mut self, _percent: Float, _preview: Option<&dyn Fn() -> PreviewImage>) {}

    fn message(&mut self, _msg: &str) {}

    fn error(&mut self, _err: &str) {}

    fn end_stage(&mut self) {}

    fn end(&mut self) {
        if let Some(t) = self.started {
            self.finished_seconds = t.elapsed().as_secs_f64() as Float;
        }
    }

    fn total_seconds(&self) -> Float {
        self.finished_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_reporter_tracks_elapsed_time() {
        let mut r = SilentReporter::new();
        r.begin();
        r.end();
        assert!(r.total_seconds() >= 0.0);
    }
}
