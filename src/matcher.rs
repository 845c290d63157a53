use tracing::trace;

use crate::logging::STAMP_MATCH;

/// Anything carrying a text payload the matcher can scan.
pub trait TextItem {
    fn text(&self) -> &str;
}

impl TextItem for String {
    fn text(&self) -> &str {
        self
    }
}

impl TextItem for &str {
    fn text(&self) -> &str {
        self
    }
}

/// Outcome of scanning a fragment sequence for a search string.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMatch<'a, F> {
    /// The contiguous run, in source order, whose concatenation first
    /// contained the search string.
    Found(Vec<&'a F>),
    NotFound,
}

impl<'a, F> RunMatch<'a, F> {
    pub fn is_found(&self) -> bool {
        matches!(self, RunMatch::Found(_))
    }

    /// The fragment that completed the match. Its position anchors overlays.
    pub fn last(&self) -> Option<&'a F> {
        match self {
            RunMatch::Found(run) => run.last().copied(),
            RunMatch::NotFound => None,
        }
    }

    /// The matched run, or an empty vector when nothing matched.
    pub fn into_fragments(self) -> Vec<&'a F> {
        match self {
            RunMatch::Found(run) => run,
            RunMatch::NotFound => Vec::new(),
        }
    }
}

/// Per-fragment scanning state.
///
/// `Idle` is equivalent to `Scanning` with the whole search string left to
/// match, nothing matched and an empty run.
#[derive(Debug)]
enum ScanState<'s, 'a, F> {
    Idle,
    Scanning {
        remaining: &'s str,
        matched: String,
        run: Vec<&'a F>,
    },
    Matched(Vec<&'a F>),
}

impl<'s, 'a, F: TextItem> ScanState<'s, 'a, F> {
    fn step(self, search: &'s str, fragment: &'a F) -> Self {
        let (remaining, mut matched, mut run) = match self {
            ScanState::Idle => (search, String::new(), Vec::new()),
            ScanState::Scanning {
                remaining,
                matched,
                run,
            } => (remaining, matched, run),
            done @ ScanState::Matched(_) => return done,
        };

        let text = fragment.text();
        let is_prefix_continuation = remaining.starts_with(text);
        matched.push_str(text);
        let completes_match = matched.contains(search);

        if !is_prefix_continuation && !completes_match {
            // The fragment that broke the run is not retried as a new start.
            trace!(target: STAMP_MATCH, fragment = text, "run reset");
            return ScanState::Idle;
        }

        run.push(fragment);
        if completes_match {
            return ScanState::Matched(run);
        }

        ScanState::Scanning {
            remaining: &remaining[text.len()..],
            matched,
            run,
        }
    }
}

/// Finds the earliest contiguous run of `fragments` whose concatenated text
/// contains `search`.
///
/// Single forward pass. A fragment joins the current run when it is the next
/// prefix of the still unmatched part of `search`, or when appending it makes
/// the accumulated text contain `search`. Any other fragment discards the run.
/// Matching is exact and case-sensitive; empty fragments are absorbed.
pub fn find_run<'a, F: TextItem>(search: &str, fragments: &'a [F]) -> RunMatch<'a, F> {
    let mut state = ScanState::Idle;

    for fragment in fragments {
        state = match state.step(search, fragment) {
            ScanState::Matched(run) => return RunMatch::Found(run),
            next => next,
        };
    }

    RunMatch::NotFound
}
