//! Mock placement advisor for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AdvisorSource, PlacementAdvisor, PlacementSuggestion};
use crate::error::{BrandError, Result};

/// One scripted mock reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this suggestion.
    Suggest(PlacementSuggestion),
    /// Fail, exercising the fallback path.
    Fail,
}

/// Deterministic advisor that never touches the network.
///
/// Replies follow a script when one is provided; once the script is
/// exhausted (or when there is none) every call gets the default reply.
pub struct MockAdvisor {
    script: Mutex<VecDeque<MockReply>>,
    default: MockReply,
}

impl MockAdvisor {
    /// Always reply with the given suggestion.
    pub fn new(suggestion: PlacementSuggestion) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: MockReply::Suggest(suggestion),
        }
    }

    /// Always fail.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: MockReply::Fail,
        }
    }

    /// Reply per the script, one entry per call, then fall back to the
    /// deterministic fallback suggestion.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            default: MockReply::Suggest(PlacementSuggestion::fallback()),
        }
    }

    fn next_reply(&self) -> MockReply {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        script.pop_front().unwrap_or_else(|| self.default.clone())
    }
}

impl Default for MockAdvisor {
    fn default() -> Self {
        Self::new(PlacementSuggestion::fallback())
    }
}

#[async_trait]
impl PlacementAdvisor for MockAdvisor {
    async fn suggest(&self, _image: &[u8], _preferred_padding: u32) -> Result<PlacementSuggestion> {
        match self.next_reply() {
            MockReply::Suggest(suggestion) => Ok(suggestion),
            MockReply::Fail => Err(BrandError::Advisor("mock advisor failure".into())),
        }
    }

    fn source_id(&self) -> AdvisorSource {
        AdvisorSource::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Corner;

    fn suggestion(corner: Corner) -> PlacementSuggestion {
        PlacementSuggestion {
            corner,
            padding: 30,
            bounding_box: None,
        }
    }

    #[tokio::test]
    async fn test_fixed_reply() {
        let advisor = MockAdvisor::new(suggestion(Corner::TopLeft));
        for _ in 0..3 {
            let reply = advisor.suggest(b"img", 50).await.unwrap();
            assert_eq!(reply.corner, Corner::TopLeft);
        }
    }

    #[tokio::test]
    async fn test_failing_reply() {
        let advisor = MockAdvisor::failing();
        assert!(advisor.suggest(b"img", 50).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_replies_then_fallback() {
        let advisor = MockAdvisor::scripted(vec![
            MockReply::Suggest(suggestion(Corner::TopRight)),
            MockReply::Fail,
        ]);

        let first = advisor.suggest(b"img", 50).await.unwrap();
        assert_eq!(first.corner, Corner::TopRight);

        assert!(advisor.suggest(b"img", 50).await.is_err());

        // Script exhausted: deterministic fallback from here on.
        let third = advisor.suggest(b"img", 50).await.unwrap();
        assert_eq!(third, PlacementSuggestion::fallback());
    }

    #[test]
    fn test_source_id() {
        assert_eq!(MockAdvisor::default().source_id(), AdvisorSource::Mock);
    }
}
