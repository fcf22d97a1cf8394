//! Terminal rendering of turn events.
//!
//! The placeholder turn is a spinner whose message carries the estimated
//! progress and elapsed seconds. Each reveal frame replaces the previous one
//! wholesale: the lines of the last frame are cleared and the new frame is
//! written in full, since a partially revealed token ("**Nor") can re-parse
//! into different text on the next frame and a pure append would leave the
//! stale fragment behind.

use cliclack::{spinner, ProgressBar};
use console::{style, Term};
use medreport::lifecycle::{Section, TurnEvent};

pub struct EventRenderer {
    term: Term,
    placeholder: ProgressBar,
    percent: f64,
    seconds: u64,
    frame_lines: usize,
}

impl EventRenderer {
    pub fn new() -> Self {
        EventRenderer {
            term: Term::stdout(),
            placeholder: spinner(),
            percent: 0.0,
            seconds: 0,
            frame_lines: 0,
        }
    }

    pub fn handle(&mut self, event: &TurnEvent) {
        match event {
            TurnEvent::Started => {
                self.placeholder.start("analyzing medical report...");
            }
            TurnEvent::Progress { percent } => {
                self.percent = *percent;
                self.update_placeholder();
            }
            TurnEvent::Elapsed { seconds } => {
                self.seconds = *seconds;
                self.update_placeholder();
            }
            TurnEvent::PlaceholderCleared => {
                self.placeholder.stop("");
            }
            TurnEvent::SectionStarted { section } => {
                self.frame_lines = 0;
                let header = match section {
                    Section::Analysis => style("Analysis").cyan().bold(),
                    Section::Recommendations => style("Health recommendations").green().bold(),
                };
                let _ = self.term.write_line(&header.to_string());
            }
            TurnEvent::Frame { markup, .. } => {
                let text = terminal_text(markup);
                let _ = self.term.clear_last_lines(self.frame_lines);
                let _ = self.term.write_str(&text);
                self.frame_lines = text.lines().count();
            }
            TurnEvent::ScrollToLatest => {
                // The terminal already follows the cursor.
            }
            TurnEvent::SectionCompleted { .. } => {
                self.frame_lines = 0;
                let _ = self.term.write_line("");
            }
            TurnEvent::Succeeded { .. } | TurnEvent::Failed { .. } => {}
        }
    }

    fn update_placeholder(&mut self) {
        self.placeholder.set_message(format!(
            "analyzing medical report... {:.0}% · {}s",
            self.percent, self.seconds
        ));
    }
}

/// Flatten markup for a terminal: block boundaries become newlines, list
/// items get a bullet, escape entities are decoded, other tags drop out.
fn terminal_text(markup: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#039;", '\''),
    ];

    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('<') {
            let Some(end) = after.find('>') else { break };
            let tag = &after[..end];
            let name = tag.split_whitespace().next().unwrap_or("");
            match name {
                "li" => out.push_str("• "),
                "br" | "hr" | "/p" | "/li" | "/pre" | "/h1" | "/h2" | "/h3" | "/h4" | "/h5"
                | "/h6" => out.push('\n'),
                _ => {}
            }
            rest = &after[end + 1..];
        } else if rest.starts_with('&') {
            match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
                Some((entity, ch)) => {
                    out.push(*ch);
                    rest = &rest[entity.len()..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        } else {
            let ch = rest.chars().next().unwrap();
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}
