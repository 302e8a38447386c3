use std::time::Instant;

use crate::error::{ClientError, classify_authenticated};
use crate::gateway::{
    AuthRequirement, GENERATE_ARTICLE_PATH, GENERATE_FULL_ARTICLE_PATH, GENERATE_HTML_PATH,
    GENERATE_SEO_PATH, GatewayError, RequestGateway,
};
use crate::session::SessionController;
use crate::types::{
    ArticleStageResponse, FullArticleResponse, GenerateArticleBody, GenerationResult,
    RenderHtmlBody, RenderedDocument, SeoStageResponse,
};

/// How a request is turned into a consolidated result. Callers never see
/// the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStrategy {
    /// One remote call that runs every stage server-side.
    #[default]
    OneShot,
    /// Article, then SEO, then HTML, each a separate call.
    Staged,
}

impl GenerationStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneShot => "one_shot",
            Self::Staged => "staged",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "one_shot" | "one-shot" | "oneshot" | "full" => Some(Self::OneShot),
            "staged" | "stages" | "per_stage" | "per-stage" => Some(Self::Staged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Article,
    Seo,
    Render,
}

impl GenerationStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Seo => "seo",
            Self::Render => "render",
        }
    }

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Article => GENERATE_ARTICLE_PATH,
            Self::Seo => GENERATE_SEO_PATH,
            Self::Render => GENERATE_HTML_PATH,
        }
    }
}

pub const STAGED_PIPELINE: [GenerationStage; 3] = [
    GenerationStage::Article,
    GenerationStage::Seo,
    GenerationStage::Render,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    query: String,
    context_url: Option<String>,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context_url: None,
        }
    }

    /// An empty URL counts as no URL. Anything else is passed through
    /// untouched.
    #[must_use]
    pub fn with_context_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.context_url = if url.is_empty() { None } else { Some(url) };
        self
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn context_url(&self) -> Option<&str> {
        self.context_url.as_deref()
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.query.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn body(&self) -> GenerateArticleBody<'_> {
        GenerateArticleBody {
            query: &self.query,
            url: self.context_url(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOrchestrator {
    gateway: RequestGateway,
    session: SessionController,
    strategy: GenerationStrategy,
}

impl GenerationOrchestrator {
    #[must_use]
    pub fn new(
        gateway: RequestGateway,
        session: SessionController,
        strategy: GenerationStrategy,
    ) -> Self {
        Self {
            gateway,
            session,
            strategy,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> GenerationStrategy {
        self.strategy
    }

    /// Returns either the full article/SEO/HTML triple or one classified
    /// failure. An authorization rejection at any point also ends the
    /// session.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ClientError> {
        request.validate()?;

        let started = Instant::now();
        let outcome = match self.strategy {
            GenerationStrategy::OneShot => self.generate_one_shot(request).await,
            GenerationStrategy::Staged => self.generate_staged(request).await,
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(result) => {
                tracing::info!(
                    strategy = self.strategy.as_str(),
                    title = %result.article.title,
                    html_bytes = result.rendered.html.len(),
                    elapsed_ms,
                    "article generated"
                );
                Ok(result)
            }
            Err(error) => {
                let error = classify_authenticated(error);
                if error.requires_reauthentication() {
                    self.session.expire_session();
                }
                tracing::warn!(
                    strategy = self.strategy.as_str(),
                    kind = error.kind(),
                    %error,
                    elapsed_ms,
                    "article generation failed"
                );
                Err(error)
            }
        }
    }

    async fn generate_one_shot(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let response: FullArticleResponse = self
            .gateway
            .post_json(
                GENERATE_FULL_ARTICLE_PATH,
                &request.body(),
                &AuthRequirement::AccessToken,
            )
            .await?;

        Ok(GenerationResult {
            article: response.article,
            seo: response.seo,
            rendered: RenderedDocument {
                html: response.html,
            },
        })
    }

    /// Each stage consumes the previous stage's output, so the calls are
    /// strictly sequential. Nothing from a finished stage outlives a later
    /// failure.
    async fn generate_staged(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let [article_stage, seo_stage, render_stage] = STAGED_PIPELINE;

        tracing::debug!(stage = article_stage.as_str(), "running generation stage");
        let article = self
            .gateway
            .post_json::<_, ArticleStageResponse>(
                article_stage.path(),
                &request.body(),
                &AuthRequirement::AccessToken,
            )
            .await?
            .into_article();

        tracing::debug!(stage = seo_stage.as_str(), "running generation stage");
        let seo = self
            .gateway
            .post_json::<_, SeoStageResponse>(
                seo_stage.path(),
                &article,
                &AuthRequirement::AccessToken,
            )
            .await?
            .into_seo();

        tracing::debug!(stage = render_stage.as_str(), "running generation stage");
        let rendered: RenderedDocument = self
            .gateway
            .post_json(
                render_stage.path(),
                &RenderHtmlBody {
                    article: &article,
                    seo: &seo,
                },
                &AuthRequirement::AccessToken,
            )
            .await?;

        Ok(GenerationResult {
            article,
            seo,
            rendered,
        })
    }
}
