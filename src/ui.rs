use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    /// Progress bar over the accepted-frame count. Pretty output goes to
    /// stderr so the raw frame dump on stdout stays clean.
    pub fn capture_progress(&self, total: usize) -> CaptureProgress {
        let use_pretty = self.is_tty
            && match self.mode {
                UiMode::Pretty | UiMode::Auto => true,
                UiMode::Plain => false,
            };

        if use_pretty {
            let bar = ProgressBar::new(total as u64);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template("{bar:24} {pos}/{len} frames")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            CaptureProgress { bar: Some(bar) }
        } else {
            CaptureProgress { bar: None }
        }
    }
}

pub struct CaptureProgress {
    bar: Option<ProgressBar>,
}

impl CaptureProgress {
    pub fn set(&self, accepted: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(accepted as u64);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
