use super::context::{FeedContext, ResolvedContext};
use super::controller::FeedController;
use super::state::{FeedState, Phase};
use crate::gateway::ContentGateway;

/// Read-only snapshot handed to a [`Presenter`].
#[derive(Debug, Clone, Copy)]
pub struct FeedView<'a> {
    pub context: Option<&'a FeedContext>,
    pub resolved: Option<&'a ResolvedContext>,
    pub state: &'a FeedState,
}

impl FeedView<'_> {
    /// Heading for the feed, if the context has been resolved.
    pub fn title(&self) -> Option<&str> {
        self.resolved.map(|r| r.title.as_str())
    }
}

/// Presentation side effects (document title, analytics, headings) that run
/// once a context has loaded. The controller itself never calls this.
pub trait Presenter {
    fn context_ready(&mut self, view: &FeedView<'_>);
}

impl<G: ContentGateway> FeedController<G> {
    pub fn view(&self) -> FeedView<'_> {
        FeedView {
            context: self.context(),
            resolved: self.resolved(),
            state: self.state(),
        }
    }
}

/// Calls `presenter` only when `controller` holds a successfully loaded
/// context. Returns whether it was called.
pub fn present_if_ready<G, P>(controller: &FeedController<G>, presenter: &mut P) -> bool
where
    G: ContentGateway,
    P: Presenter + ?Sized,
{
    if controller.state().phase() != &Phase::Ready {
        return false;
    }
    presenter.context_ready(&controller.view());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::scripted::ScriptedGateway;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        titles: Vec<String>,
    }

    impl Presenter for Recorder {
        fn context_ready(&mut self, view: &FeedView<'_>) {
            self.titles.push(view.title().unwrap_or_default().to_string());
        }
    }

    #[tokio::test]
    async fn test_presents_after_successful_initialize() {
        let gateway = ScriptedGateway::new()
            .reply(json!({"category": {"CategoryID": 3, "CategoryName": "Sports", "Slug": "sports"}}))
            .reply(json!({"items": [{"ContentID": 1}]}))
            .reply(json!({"data": []}));
        let mut controller = FeedController::new(gateway);
        let mut recorder = Recorder::default();

        assert!(!present_if_ready(&controller, &mut recorder));

        controller
            .initialize(FeedContext::category_slug("sports"), None)
            .await
            .unwrap();

        assert!(present_if_ready(&controller, &mut recorder));
        assert_eq!(recorder.titles, vec!["Sports".to_string()]);
    }

    #[tokio::test]
    async fn test_not_presented_when_not_found() {
        let gateway = ScriptedGateway::new().reply(json!({"category": null}));
        let mut controller = FeedController::new(gateway);
        let mut recorder = Recorder::default();

        controller
            .initialize(FeedContext::category_slug("gone"), None)
            .await
            .unwrap();

        assert!(!present_if_ready(&controller, &mut recorder));
        assert!(recorder.titles.is_empty());
    }
}
