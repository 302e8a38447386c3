//! Moving a generation result from the submission surface to the display
//! surface.
//!
//! A result travels inside exactly one [`Navigation`]. The display surface
//! consumes it; nothing keeps a copy, so arriving at the display surface any
//! other way finds no result and is sent back to submission.

use crate::session::{SessionPhase, SessionState};
use crate::types::GenerationResult;

pub const LOGIN_ROUTE_PATH: &str = "/login";
pub const GENERATOR_ROUTE_PATH: &str = "/";
pub const ARTICLE_ROUTE_PATH: &str = "/article";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRoute {
    Login,
    Generator,
    Article,
}

impl AppRoute {
    /// Unknown paths land on the generator, like the web front-end's
    /// catch-all route.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            LOGIN_ROUTE_PATH => Self::Login,
            ARTICLE_ROUTE_PATH => Self::Article,
            _ => Self::Generator,
        }
    }

    #[must_use]
    pub fn to_path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_ROUTE_PATH,
            Self::Generator => GENERATOR_ROUTE_PATH,
            Self::Article => ARTICLE_ROUTE_PATH,
        }
    }

    #[must_use]
    pub fn requires_session(self) -> bool {
        !matches!(self, Self::Login)
    }
}

/// A generation result in transit. Deliberately not `Clone`: once the
/// display surface takes it, it is gone.
#[derive(Debug, PartialEq, Eq)]
pub struct ResultHandoff {
    result: GenerationResult,
}

impl ResultHandoff {
    #[must_use]
    pub fn into_result(self) -> GenerationResult {
        self.result
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Navigation {
    route: AppRoute,
    handoff: Option<ResultHandoff>,
}

impl Navigation {
    #[must_use]
    pub fn to(route: AppRoute) -> Self {
        Self {
            route,
            handoff: None,
        }
    }

    /// The submission surface's only way to reach the display surface
    /// with a result.
    #[must_use]
    pub fn to_article(result: GenerationResult) -> Self {
        Self {
            route: AppRoute::Article,
            handoff: Some(ResultHandoff { result }),
        }
    }

    #[must_use]
    pub fn route(&self) -> AppRoute {
        self.route
    }

    #[must_use]
    pub fn carries_result(&self) -> bool {
        self.handoff.is_some()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Screen {
    Login,
    Generator,
    /// Session restore is still in flight; nothing protected is shown yet.
    Pending,
    Article(GenerationResult),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Landing {
    pub screen: Screen,
    /// Set when the requested route could not be shown and the user was
    /// sent elsewhere.
    pub redirected_from: Option<AppRoute>,
}

impl Landing {
    fn shown(screen: Screen) -> Self {
        Self {
            screen,
            redirected_from: None,
        }
    }

    fn redirected(screen: Screen, from: AppRoute) -> Self {
        Self {
            screen,
            redirected_from: Some(from),
        }
    }
}

/// Resolves one navigation against the current session. Protected routes
/// require an authenticated session; the article route additionally needs a
/// result handed off by this very navigation.
#[must_use]
pub fn navigate(navigation: Navigation, session: &SessionState) -> Landing {
    let Navigation { route, handoff } = navigation;

    if route.requires_session() {
        match session.phase {
            SessionPhase::Authenticated => {}
            SessionPhase::Authenticating => return Landing::shown(Screen::Pending),
            SessionPhase::Unauthenticated => {
                tracing::debug!(route = route.to_path(), "protected route without session");
                return Landing::redirected(Screen::Login, route);
            }
        }
    }

    match (route, handoff) {
        (AppRoute::Login, _) => Landing::shown(Screen::Login),
        (AppRoute::Generator, _) => Landing::shown(Screen::Generator),
        (AppRoute::Article, Some(handoff)) => {
            Landing::shown(Screen::Article(handoff.into_result()))
        }
        (AppRoute::Article, None) => {
            tracing::debug!("display surface opened without a result");
            Landing::redirected(Screen::Generator, AppRoute::Article)
        }
    }
}
