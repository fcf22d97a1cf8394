//! Incremental reveal of rendered markup.
//!
//! The controller animates a text by re-rendering growing prefixes of the raw
//! input, not by slicing the finished markup: a half-revealed list marker or
//! heading still parses as structure instead of leaking broken tag fragments.
//! Rescanning the prefix every frame is quadratic in text length; that is the
//! intended behavior at the sizes involved, and anything past the animation
//! threshold skips the animation entirely.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::markup;

/// Delay between reveal steps; doubled after sentence-ending punctuation.
pub const BASE_STEP: Duration = Duration::from_millis(15);

/// Texts with more visible characters than this render in one frame.
pub const MAX_ANIMATED_CHARS: usize = 2000;

const SCROLL_EVERY: usize = 10;

/// Pause-inducing marks, fullwidth and ASCII treated identically.
const PAUSE_MARKS: [char; 8] = ['。', '，', '！', '？', '.', ',', '!', '?'];

/// Where reveal frames go. The frontend renders `markup` however it likes;
/// `scroll_to_latest` is a hint fired every few steps and at the end.
pub trait RevealSink: Send + 'static {
    fn display(&mut self, markup: &str);
    fn scroll_to_latest(&mut self);
}

/// Resolves once the reveal has displayed its final frame.
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Completion {
    /// Returns false if the reveal was superseded or cancelled first.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}

/// One animation slot. Starting a new reveal aborts whatever the slot was
/// running, so two animations never interleave on the same display.
#[derive(Default)]
pub struct RevealController {
    task: Option<JoinHandle<()>>,
}

impl RevealController {
    pub fn new() -> Self {
        RevealController::default()
    }

    pub fn begin<S: RevealSink>(&mut self, text: &str, mut sink: S) -> Completion {
        self.cancel();

        let text = text.to_string();
        let (done_tx, done_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(async move {
            animate(&text, &mut sink).await;
            let _ = done_tx.send(());
        }));

        Completion { rx: done_rx }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RevealController {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn animate<S: RevealSink>(text: &str, sink: &mut S) {
    let full = markup::render(text);
    let visible: Vec<char> = markup::visible_text(&full).chars().collect();

    if visible.len() > MAX_ANIMATED_CHARS {
        sink.display(&full);
        return;
    }

    let raw_len = text.chars().count();
    for i in 0..visible.len() {
        let ratio = (i + 1) as f64 / visible.len() as f64;
        let take = (raw_len as f64 * ratio).floor() as usize;
        let end = text
            .char_indices()
            .nth(take)
            .map_or(text.len(), |(idx, _)| idx);
        sink.display(&markup::render(&text[..end]));

        if (i + 1) % SCROLL_EVERY == 0 {
            sink.scroll_to_latest();
        }

        let delay = if PAUSE_MARKS.contains(&visible[i]) {
            BASE_STEP * 2
        } else {
            BASE_STEP
        };
        sleep(delay).await;
    }

    // The precomputed rendering, not the last ratio approximation.
    sink.display(&full);
    sink.scroll_to_latest();
}
