use super::{Settings, Warning};
use log::warn;

/// State threaded through every pass of a run
pub struct PatchContext<'a> {
    pub settings: &'a Settings,
    warnings: Vec<Warning>,
}

impl<'a> PatchContext<'a> {
    pub fn new(settings: &'a Settings) -> PatchContext<'a> {
        PatchContext {
            settings,
            warnings: vec![],
        }
    }

    /// Record a recoverable problem (also logged right away)
    pub fn warn(&mut self, pass: &'static str, message: impl Into<String>) {
        let warning = Warning {
            pass,
            message: message.into(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
