use serde::Serialize;

use crate::models::MovieDetails;

/// Which terminal state a voting round ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    Match,
    Waiting,
    NoMatch,
    NoUpvotes,
}

/// What a participant is shown once they cannot vote any further
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndOfVotes {
    pub kind: OutcomeKind,
    pub headline: String,
    pub message: String,
    pub cover: Option<String>,
    pub poster: Option<String>,
    /// Title of the matched movie
    pub title: Option<String>,
}

impl EndOfVotes {
    fn new(kind: OutcomeKind, headline: &str, message: &str, cover: Option<&str>) -> Self {
        Self {
            kind,
            headline: headline.to_string(),
            message: message.to_string(),
            cover: cover.map(str::to_string),
            poster: None,
            title: None,
        }
    }

    pub fn matched(details: &MovieDetails) -> Self {
        Self {
            cover: details.images.cover().map(str::to_string),
            poster: details.images.cover_poster.clone(),
            title: Some(details.title.clone()),
            ..Self::new(
                OutcomeKind::Match,
                "It's a match!",
                "Great choice! Get ready to watch your new favorite film together.",
                None,
            )
        }
    }

    pub fn waiting() -> Self {
        Self::new(
            OutcomeKind::Waiting,
            "All movies voted",
            "You have voted for all the movies in your watchlist. Now, wait for others to vote to see if there's a match.",
            Some("assets/img/waiting.jpg"),
        )
    }

    pub fn no_match() -> Self {
        Self::new(
            OutcomeKind::NoMatch,
            "No match found...",
            "All votes are in, but no matches were found. Please try voting again or select a different set of movies.",
            Some("assets/img/no-match.jpg"),
        )
    }

    pub fn no_upvotes() -> Self {
        Self::new(
            OutcomeKind::NoUpvotes,
            "No upvote!",
            "You haven't upvoted any films. Please vote again or reload different films to find matches.",
            Some("assets/img/no-upvote.jpg"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_prefers_snapshot() {
        let mut details = MovieDetails::untitled("abc", "Heat");
        details.images.background = Some("bg.jpg".to_string());
        details.images.snapshot = Some("snap.jpg".to_string());
        details.images.cover_poster = Some("poster.jpg".to_string());

        let outcome = EndOfVotes::matched(&details);
        assert_eq!(outcome.kind, OutcomeKind::Match);
        assert_eq!(outcome.cover.as_deref(), Some("snap.jpg"));
        assert_eq!(outcome.poster.as_deref(), Some("poster.jpg"));
        assert_eq!(outcome.title.as_deref(), Some("Heat"));
    }

    #[test]
    fn test_matched_falls_back_to_background() {
        let mut details = MovieDetails::untitled("abc", "Heat");
        details.images.background = Some("bg.jpg".to_string());

        assert_eq!(EndOfVotes::matched(&details).cover.as_deref(), Some("bg.jpg"));
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&OutcomeKind::NoUpvotes).unwrap(),
            "\"no-upvotes\""
        );
        assert_eq!(EndOfVotes::no_match().poster, None);
    }
}
