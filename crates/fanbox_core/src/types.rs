//! Data model of the FANBOX API responses consumed by the archiver.
//!
//! Only the fields the archiver reads are modelled. Bodies are kept as raw
//! JSON until [`PostInfo::content`] interprets them, because the `type` and
//! `body` fields are siblings and the body is `null` for restricted posts.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Post shape as reported by the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Image,
    File,
    Article,
    Text,
    Unknown,
}

impl PostType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "image" => PostType::Image,
            "file" => PostType::File,
            "article" => PostType::Article,
            "text" => PostType::Text,
            _ => PostType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub fee_required: u32,
    #[serde(default)]
    pub is_restricted: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_datetime: String,
    #[serde(default)]
    pub updated_datetime: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    /// Raw `type` tag; kept verbatim so unknown types can be reported.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("post body is missing")]
    Missing,
    #[error("post body does not match type {kind}: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PostInfo {
    pub fn post_type(&self) -> PostType {
        PostType::from_tag(&self.kind)
    }

    /// Whether the post already carries a body (list responses usually do not).
    pub fn has_body(&self) -> bool {
        matches!(self.body, Some(ref body) if !body.is_null())
    }

    /// Interprets the raw body according to the post type.
    pub fn content(&self) -> Result<PostBody, BodyError> {
        let body = match self.body {
            Some(ref body) if !body.is_null() => body,
            _ => return Err(BodyError::Missing),
        };
        let malformed = |source| BodyError::Malformed {
            kind: self.kind.clone(),
            source,
        };
        let parsed = match self.post_type() {
            PostType::Image => PostBody::Image(ImageBody::deserialize(body).map_err(malformed)?),
            PostType::File => PostBody::File(FileBody::deserialize(body).map_err(malformed)?),
            PostType::Article => {
                PostBody::Article(ArticleBody::deserialize(body).map_err(malformed)?)
            }
            PostType::Text => PostBody::Text(TextBody::deserialize(body).map_err(malformed)?),
            PostType::Unknown => PostBody::Unknown,
        };
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostBody {
    Image(ImageBody),
    File(FileBody),
    Article(ArticleBody),
    Text(TextBody),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// Article body: ordered blocks plus id-keyed media maps in document order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    #[serde(default, deserialize_with = "lenient_blocks")]
    pub blocks: Vec<Block>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_map: IndexMap<String, ImageInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_map: IndexMap<String, FileInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub embed_map: IndexMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url_embed_map: IndexMap<String, Value>,
}

/// An explicit `null` reads like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A block that does not match the shape of its `type` becomes [`Block::Unknown`]
/// instead of failing the whole article.
fn lenient_blocks<'de, D>(deserializer: D) -> Result<Vec<Block>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = null_as_default(deserializer)?;
    Ok(raw
        .iter()
        .map(|value| Block::deserialize(value).unwrap_or(Block::Unknown))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub original_url: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub url: String,
    pub name: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "p")]
    Paragraph {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    #[serde(rename = "header")]
    Header {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    #[serde(rename = "image")]
    Image {
        #[serde(rename = "imageId")]
        image_id: String,
    },
    #[serde(rename = "file")]
    File {
        #[serde(rename = "fileId")]
        file_id: String,
    },
    #[serde(rename = "embed")]
    Embed {
        #[serde(rename = "embedId")]
        embed_id: String,
    },
    #[serde(rename = "url_embed")]
    UrlEmbed {
        #[serde(rename = "urlEmbedId")]
        url_embed_id: String,
    },
    #[serde(other)]
    Unknown,
}

/// Post referenced by a `fanbox.post` url-embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub creator_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UrlEmbed {
    Default { url: String, host: String },
    Html { html: String },
    HtmlCard { html: String },
    FanboxPost(EmbeddedPost),
    /// Variant this crate does not know about, kept for a diagnostic dump.
    Unknown(Value),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum KnownUrlEmbed {
    #[serde(rename = "default")]
    Default { url: String, host: String },
    #[serde(rename = "html")]
    Html { html: String },
    #[serde(rename = "html.card")]
    HtmlCard { html: String },
    #[serde(rename = "fanbox.post")]
    FanboxPost {
        #[serde(rename = "postInfo")]
        post_info: EmbeddedPost,
    },
}

impl UrlEmbed {
    pub fn from_value(value: &Value) -> Self {
        match KnownUrlEmbed::deserialize(value) {
            Ok(KnownUrlEmbed::Default { url, host }) => UrlEmbed::Default { url, host },
            Ok(KnownUrlEmbed::Html { html }) => UrlEmbed::Html { html },
            Ok(KnownUrlEmbed::HtmlCard { html }) => UrlEmbed::HtmlCard { html },
            Ok(KnownUrlEmbed::FanboxPost { post_info }) => UrlEmbed::FanboxPost(post_info),
            Err(_) => UrlEmbed::Unknown(value.clone()),
        }
    }
}

/// Entry of `plan.listCreator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub fee: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

/// Entry of `tag.getFeatured`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedTag {
    pub tag: String,
    #[serde(default)]
    pub count: u64,
}
