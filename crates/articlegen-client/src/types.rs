use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Whatever `/api/me` returns. Only `username` is interpreted; the rest is
/// carried verbatim and replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub heading: String,
    pub content: String,
}

/// An article as produced by the generation service.
///
/// Every field the service sends is preserved, including ones this client
/// does not know about, so the article can be posted back to later stages
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ArticleSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Plain-text body for services that do not structure the article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            introduction: None,
            sections: Vec::new(),
            conclusion: None,
            references: Vec::new(),
            body: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, rename = "meta_tags", alias = "metaTags")]
    pub meta_tags: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html: String,
}

/// The consolidated article + SEO + HTML triple. There is no way to build
/// one with a missing part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub article: Article,
    pub seo: SeoMetadata,
    pub rendered: RenderedDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct GenerateArticleBody<'a> {
    pub query: &'a str,
    pub url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct FullArticleResponse {
    pub article: Article,
    pub seo: SeoMetadata,
    pub html: String,
}

/// Stage endpoints answer either `{"article": {...}}` or the bare article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArticleStageResponse(Article);

impl ArticleStageResponse {
    pub fn into_article(self) -> Article {
        self.0
    }
}

impl<'de> Deserialize<'de> for ArticleStageResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        unwrap_envelope(deserializer, "article").map(Self)
    }
}

/// `{"seo": {...}}` or the bare metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeoStageResponse(SeoMetadata);

impl SeoStageResponse {
    pub fn into_seo(self) -> SeoMetadata {
        self.0
    }
}

impl<'de> Deserialize<'de> for SeoStageResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        unwrap_envelope(deserializer, "seo").map(Self)
    }
}

/// A top-level `key` marks the envelope. Decode errors inside it keep the
/// key as a prefix instead of collapsing into a generic shape mismatch.
fn unwrap_envelope<'de, D, T>(deserializer: D, key: &str) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let mut value = Value::deserialize(deserializer)?;
    match value.as_object_mut().and_then(|object| object.remove(key)) {
        Some(inner) => serde_json::from_value(inner)
            .map_err(|error| D::Error::custom(format!("{key}: {error}"))),
        None => serde_json::from_value(value).map_err(D::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RenderHtmlBody<'a> {
    pub article: &'a Article,
    pub seo: &'a SeoMetadata,
}
