//! Post text construction within the Bluesky character budget.
//!
//! A post reads:
//!
//! ```text
//! New paper from <name> (ORCID: <profile url>)
//! <title>
//! <doi url>          (when known)
//! #tag1 #tag2        (when configured)
//! ```
//!
//! The name, profile URL and DOI are link facets; hashtags are tag facets.
//! Only the title is shortened to make a post fit. Should the decorations
//! alone overflow, trailing hashtags are dropped one by one, and as a last
//! resort the whole text is clipped. Lengths count Unicode scalar values.

/// Hard limit on post length.
pub const MAX_CHARS: usize = 300;
const ELLIPSIS: char = '…';

/// Composed post text plus its rich-text annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub facets: Vec<Facet>,
}

impl PostDraft {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Annotation over `text[byte_start..byte_end]` (UTF-8 byte offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub byte_start: usize,
    pub byte_end: usize,
    pub feature: FacetFeature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetFeature {
    Link { uri: String },
    Tag { tag: String },
}

/// Build a post announcing `title` by `author_name`, never longer than [`MAX_CHARS`].
pub fn compose(
    author_name: &str,
    profile_url: &str,
    title: &str,
    doi_url: Option<&str>,
    hashtags: &[String],
) -> PostDraft {
    let tags = normalize_tags(hashtags);
    let mut keep = tags.len();
    loop {
        let draft = fit_title(author_name, profile_url, title, doi_url, &tags[..keep]);
        if draft.char_len() <= MAX_CHARS {
            return draft;
        }
        if keep == 0 {
            tracing::warn!(
                len = draft.char_len(),
                "compose.clipped: decorations alone exceed the post limit"
            );
            return clip(draft);
        }
        keep -= 1;
        tracing::debug!(dropped = %tags[keep], "compose.hashtag_dropped");
    }
}

fn fit_title(
    author_name: &str,
    profile_url: &str,
    title: &str,
    doi_url: Option<&str>,
    tags: &[String],
) -> PostDraft {
    let full = render(author_name, profile_url, title, doi_url, tags);
    let full_len = full.char_len();
    if full_len <= MAX_CHARS {
        return full;
    }

    let overhead = full_len - title.chars().count();
    let allowed = MAX_CHARS.saturating_sub(overhead).saturating_sub(1).max(1);
    let short = truncate_title(title, allowed);
    render(author_name, profile_url, &short, doi_url, tags)
}

/// First `allowed` chars, backed off to the last space, plus an ellipsis.
fn truncate_title(title: &str, allowed: usize) -> String {
    let mut cut: String = title.chars().take(allowed).collect();
    if let Some(idx) = cut.rfind(' ') {
        cut.truncate(idx);
    }
    cut.push(ELLIPSIS);
    cut
}

/// Trim, strip leading `#`s and inner whitespace so each tag is one facet span;
/// empty tags vanish.
fn normalize_tags(hashtags: &[String]) -> Vec<String> {
    hashtags
        .iter()
        .map(|t| {
            t.trim()
                .trim_start_matches('#')
                .split_whitespace()
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn render(
    author_name: &str,
    profile_url: &str,
    title: &str,
    doi_url: Option<&str>,
    tags: &[String],
) -> PostDraft {
    let mut b = RichText::default();
    b.plain("New paper from ");
    b.link(author_name, profile_url);
    b.plain(" (ORCID: ");
    b.link(profile_url, profile_url);
    b.plain(")\n");
    b.plain(title);
    if let Some(doi) = doi_url {
        b.plain("\n");
        b.link(doi, doi);
    }
    if !tags.is_empty() {
        b.plain("\n");
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                b.plain(" ");
            }
            b.tag(tag);
        }
    }
    b.finish()
}

fn clip(draft: PostDraft) -> PostDraft {
    let PostDraft { text, facets } = draft;
    let cut = text
        .char_indices()
        .nth(MAX_CHARS - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let mut clipped = text[..cut].to_string();
    clipped.push(ELLIPSIS);
    PostDraft {
        text: clipped,
        facets: facets.into_iter().filter(|f| f.byte_end <= cut).collect(),
    }
}

#[derive(Default)]
struct RichText {
    text: String,
    facets: Vec<Facet>,
}

impl RichText {
    fn plain(&mut self, s: &str) {
        self.text.push_str(s);
    }

    fn annotated(&mut self, visible: &str, feature: FacetFeature) {
        let byte_start = self.text.len();
        self.text.push_str(visible);
        if !visible.is_empty() {
            self.facets.push(Facet {
                byte_start,
                byte_end: self.text.len(),
                feature,
            });
        }
    }

    fn link(&mut self, visible: &str, uri: &str) {
        self.annotated(visible, FacetFeature::Link { uri: uri.to_string() });
    }

    fn tag(&mut self, tag: &str) {
        self.annotated(&format!("#{tag}"), FacetFeature::Tag { tag: tag.to_string() });
    }

    fn finish(self) -> PostDraft {
        PostDraft {
            text: self.text,
            facets: self.facets,
        }
    }
}
