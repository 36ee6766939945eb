use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub(crate) struct ProgressBarBuilder {
    template: &'static str,
    quiet: bool,
    len: Option<u64>,
}

impl ProgressBarBuilder {
    pub(crate) fn new(template: &'static str, quiet: bool) -> Self {
        Self {
            template,
            quiet,
            len: None,
        }
    }

    pub(crate) fn len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    /// Builds the progress bar. A bar without a length is a spinner;
    /// in quiet mode the bar is hidden.
    pub(crate) fn build(self) -> ProgressBar {
        let pbar = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };

        if self.quiet {
            pbar.set_draw_target(ProgressDrawTarget::hidden());
        }

        let style = ProgressStyle::with_template(self.template)
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        pbar.with_style(style)
    }
}
