//! Rendering use case - turns votes into bounded-length post text

use crate::model::{VoteBreakdown, VoteDetail, VoteRecord, VoteResult};

/// Marker appended to a truncated title
const ELLIPSIS: &str = "...";

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum characters of a post, as the platform counts them
    pub max_chars: usize,
    /// Characters any link counts for, regardless of its real length
    pub link_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            link_chars: 23,
        }
    }
}

/// Renderer for vote posts and thread openings
#[derive(Debug, Clone)]
pub struct VoteRenderer {
    config: RenderConfig,
}

impl VoteRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a vote, shortening its title once if the post would exceed the limit
    pub fn render_vote(&self, vote: &VoteRecord) -> String {
        let rendered = self.render_with_title(vote, &vote.title);
        let effective = self.effective_len(&rendered, &vote.uri);

        if effective <= self.config.max_chars {
            return rendered;
        }

        let excess = effective - char_len(&vote.title);
        let title_budget = self
            .config
            .max_chars
            .saturating_sub(excess)
            .saturating_sub(char_len(ELLIPSIS));

        let mut title: String = vote.title.chars().take(title_budget).collect();
        title.push_str(ELLIPSIS);

        let truncated = self.render_with_title(vote, &title);
        let truncated_len = self.effective_len(&truncated, &vote.uri);
        if truncated_len > self.config.max_chars {
            tracing::warn!(
                vote_id = %vote.id,
                effective_len = truncated_len,
                max_chars = self.config.max_chars,
                "Post still exceeds limit after title truncation"
            );
        }

        truncated
    }

    /// Render the root post of a thread for votes sharing `result`.
    ///
    /// The displayed range runs from the first to the last vote's date, gaps
    /// in between are not shown.
    pub fn render_thread_opening(&self, result: VoteResult, ordered_votes: &[VoteRecord]) -> String {
        let header = match result {
            VoteResult::Approved => "🟢 Aprovadas",
            VoteResult::Rejected => "🔴 Rejeitadas",
        };

        match (ordered_votes.first(), ordered_votes.last()) {
            (Some(first), Some(last)) => format!(
                "{} na Assembleia da República\n🗓️ {} a {}\n\n🧵👇",
                header, first.date, last.date
            ),
            _ => format!("{} na Assembleia da República\n\n🧵👇", header),
        }
    }

    /// Length as the platform counts it: links count as `link_chars` at most
    pub fn effective_len(&self, rendered: &str, uri: &str) -> usize {
        let uri_len = char_len(uri);
        char_len(rendered) - uri_len.min(char_len(rendered)) + uri_len.min(self.config.link_chars)
    }

    fn render_with_title(&self, vote: &VoteRecord, title: &str) -> String {
        let result = match vote.result {
            VoteResult::Approved => "🟢 Aprovado",
            VoteResult::Rejected => "🔴 Rejeitado",
        };

        format!(
            "📝 {title}\n🔗 {kind} ({authors}) - {uri}\n\n{result}\n\n🗳️ {phase} ({date}):\n{detail}",
            title = title,
            kind = vote.initiative_type,
            authors = vote.authors.join(", "),
            uri = vote.uri,
            result = result,
            phase = vote.phase,
            date = vote.date,
            detail = render_vote_detail(&vote.detail),
        )
    }
}

/// Render the vote breakdown block.
///
/// Absent groups are listed together with the abstentions.
pub fn render_vote_detail(detail: &VoteDetail) -> String {
    match detail {
        VoteDetail::Unanimous => "🤝 Unânime".to_string(),
        VoteDetail::Breakdown(VoteBreakdown {
            in_favour,
            against,
            abstained,
            absent,
        }) => {
            let not_voting: Vec<&str> = abstained
                .iter()
                .chain(absent.iter())
                .map(String::as_str)
                .collect();

            format!(
                "👍 {}\n👎 {}\n🤷 {}",
                in_favour.join(", "),
                against.join(", "),
                not_voting.join(", ")
            )
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
