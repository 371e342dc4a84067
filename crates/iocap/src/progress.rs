//! Console progress bar (`title |#####---------------| 25.00%`).

use std::io::Write;

const BAR_LENGTH: usize = 20;

pub struct ProgressBar {
    title: &'static str,
    total: u64,
    enabled: bool,
    /// Last rendered value in hundredths of a percent.
    last_rendered: Option<u64>,
}

impl ProgressBar {
    pub fn new(title: &'static str, total: u64, enabled: bool) -> Self {
        Self {
            title,
            total,
            enabled,
            last_rendered: None,
        }
    }

    /// Redraws the bar if the displayed percentage changed.
    pub fn update(&mut self, done: u64) {
        if !self.enabled {
            return;
        }
        let hundredths = percent_hundredths(done, self.total);
        if self.last_rendered == Some(hundredths) {
            return;
        }
        self.last_rendered = Some(hundredths);

        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}\r", render(self.title, done, self.total));
        let _ = stderr.flush();
    }

    /// Draws the bar at 100% and moves to the next line.
    pub fn finish(&mut self) {
        if !self.enabled {
            return;
        }
        self.update(self.total);
        eprintln!();
    }
}

fn percent_hundredths(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 10_000;
    }
    done.min(total) * 10_000 / total
}

fn render(title: &str, done: u64, total: u64) -> String {
    let hundredths = percent_hundredths(done, total);
    let filled = (hundredths as usize * BAR_LENGTH) / 10_000;
    format!(
        "{} |{}{}| {}.{:02}%",
        title,
        "#".repeat(filled),
        "-".repeat(BAR_LENGTH - filled),
        hundredths / 100,
        hundredths % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render(" Capture", 0, 4), " Capture |--------------------| 0.00%");
        assert_eq!(render(" Capture", 1, 4), " Capture |#####---------------| 25.00%");
        assert_eq!(render(" Capture", 4, 4), " Capture |####################| 100.00%");
        assert_eq!(render(" Capture", 1, 3), " Capture |######--------------| 33.33%");
    }

    #[test]
    fn test_render_clamps() {
        assert_eq!(render(" Done", 9, 4), " Done |####################| 100.00%");
        assert_eq!(render(" Done", 0, 0), " Done |####################| 100.00%");
    }
}
