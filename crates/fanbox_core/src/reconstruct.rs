//! Turns one fetched post into a [`PostEntry`]: HTML body, transcript,
//! metadata and the files to download.

use engine_logging::{engine_debug, engine_info, engine_warn};
use indexmap::IndexMap;
use scraper::{Html, Selector};
use serde_json::{json, Value};

use crate::aggregate::PlanNames;
use crate::html::{escape_html, file_link, image_link, link, text_lines};
use crate::ordering::resolve;
use crate::types::{ArticleBody, Block, FileBody, ImageBody, PostBody, PostInfo, UrlEmbed};
use crate::unit::{FileDescriptor, Information, MetadataFormat, PostEntry};

const DEFAULT_COVER_EXTENSION: &str = "jpeg";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Skip posts that require no fee.
    pub ignore_free: bool,
    pub metadata_format: MetadataFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedPost {
    pub entry: PostEntry,
    pub fee: u32,
}

/// Rebuilds a post, or returns `None` when it must be skipped.
pub fn reconstruct(
    post: &PostInfo,
    plans: &PlanNames,
    options: &ReconstructOptions,
) -> Option<ReconstructedPost> {
    if options.ignore_free && post.fee_required == 0 {
        engine_debug!("Skipping free post {}", post.id);
        return None;
    }
    if post.is_restricted {
        engine_info!(
            "Post {} is restricted (feeRequired: {})",
            post.id,
            post.fee_required
        );
        return None;
    }
    let body = match post.content() {
        Ok(body) => body,
        Err(err) => {
            engine_info!(
                "Post {} has no usable body (feeRequired: {}): {}",
                post.id,
                post.fee_required,
                err
            );
            return None;
        }
    };

    let mut entry = PostEntry::new(&post.id, &post.title);
    entry.tags = std::iter::once(plans.tag_by_fee(post.fee_required))
        .chain(post.tags.iter().cloned())
        .collect();

    let header = render_header(&mut entry, post);
    let (body_html, transcript) = match body {
        PostBody::Image(body) => render_image(&mut entry, &post.title, &body),
        PostBody::File(body) => render_file(&mut entry, &body),
        PostBody::Article(body) => render_article(&mut entry, &post.title, &body),
        PostBody::Text(body) => (text_lines(&body.text), body.text),
        PostBody::Unknown => {
            let placeholder = format!("不明なタイプ\n{}@{}\n", post.kind, post.id);
            engine_warn!("Unknown post type {}@{}", post.kind, post.id);
            (format!("<span>{}</span>", escape_html(&placeholder)), placeholder)
        }
    };

    entry.html = format!("{header}{body_html}");
    entry.information = information(post, &transcript, options.metadata_format);
    entry.transcript = transcript;

    Some(ReconstructedPost {
        entry,
        fee: post.fee_required,
    })
}

fn render_header(entry: &mut PostEntry, post: &PostInfo) -> String {
    let title = escape_html(&post.title);
    match post.cover_image_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => {
            let cover = entry.set_cover(&url_extension(url), url);
            format!("{}<h5>{title}</h5>\n", image_link(&cover))
        }
        None => format!("<h5>{title}</h5>\n<br>\n"),
    }
}

fn url_extension(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => DEFAULT_COVER_EXTENSION.to_string(),
    }
}

fn render_image(entry: &mut PostEntry, title: &str, body: &ImageBody) -> (String, String) {
    let tags = body
        .images
        .iter()
        .map(|image| image_link(&entry.add_file(title, &image.extension, &image.original_url)))
        .collect::<Vec<_>>()
        .join("<br>\n");
    let html = format!("{tags}<br>\n{}", text_lines(&body.text));
    (html, format!("{}\n", body.text))
}

fn render_file(entry: &mut PostEntry, body: &FileBody) -> (String, String) {
    let tags = body
        .files
        .iter()
        .map(|file| file_link(&entry.add_file(&file.name, &file.extension, &file.url)))
        .collect::<Vec<_>>()
        .join("<br>\n");
    let html = format!("{tags}<br>\n{}", text_lines(&body.text));
    (html, format!("{}\n", body.text))
}

fn render_article(entry: &mut PostEntry, title: &str, body: &ArticleBody) -> (String, String) {
    let image_ids = block_ids(&body.blocks, |block| match block {
        Block::Image { image_id } => Some(image_id),
        _ => None,
    });
    let file_ids = block_ids(&body.blocks, |block| match block {
        Block::File { file_id } => Some(file_id),
        _ => None,
    });
    let embed_ids = block_ids(&body.blocks, |block| match block {
        Block::Embed { embed_id } => Some(embed_id),
        _ => None,
    });
    let url_embed_ids = block_ids(&body.blocks, |block| match block {
        Block::UrlEmbed { url_embed_id } => Some(url_embed_id),
        _ => None,
    });

    let images: Vec<FileDescriptor> = resolve(keyed(&body.image_map), &image_ids)
        .into_iter()
        .map(|image| entry.add_file(title, &image.extension, &image.original_url))
        .collect();
    let files: Vec<FileDescriptor> = resolve(keyed(&body.file_map), &file_ids)
        .into_iter()
        .map(|file| entry.add_file(&file.name, &file.extension, &file.url))
        .collect();
    let embeds: Vec<&Value> = resolve(keyed(&body.embed_map), &embed_ids);
    let url_embeds: Vec<UrlEmbed> = resolve(keyed(&body.url_embed_map), &url_embed_ids)
        .into_iter()
        .map(UrlEmbed::from_value)
        .collect();

    // Each kind has its own cursor; a block past the end renders nothing.
    let mut images = images.iter();
    let mut files = files.iter();
    let mut embeds = embeds.into_iter();
    let mut url_embeds = url_embeds.iter();

    let html = body
        .blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph { text } => format!("<span>{}</span>", escape_html(text)),
            Block::Header { text } => format!("<h2><span>{}</span></h2>", escape_html(text)),
            Block::Image { .. } => images.next().map(image_link).unwrap_or_default(),
            Block::File { .. } => files.next().map(file_link).unwrap_or_default(),
            Block::Embed { .. } => embeds.next().map(json_span).unwrap_or_default(),
            Block::UrlEmbed { .. } => url_embeds.next().map(render_url_embed).unwrap_or_default(),
            Block::Unknown => {
                engine_warn!("Unknown block type in post {}", entry.id);
                String::new()
            }
        })
        .collect::<Vec<_>>()
        .join("<br>\n");

    let transcript = body
        .blocks
        .iter()
        .filter_map(|block| match block {
            Block::Paragraph { text } | Block::Header { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    (html, format!("{transcript}\n"))
}

fn block_ids<'a>(
    blocks: &'a [Block],
    select: impl Fn(&'a Block) -> Option<&'a String>,
) -> Vec<&'a str> {
    blocks
        .iter()
        .filter_map(select)
        .map(String::as_str)
        .collect()
}

fn keyed<'a, V>(map: &'a IndexMap<String, V>) -> impl Iterator<Item = (&'a str, &'a V)> {
    map.iter().map(|(id, value)| (id.as_str(), value))
}

fn render_url_embed(embed: &UrlEmbed) -> String {
    match embed {
        UrlEmbed::Default { url, host } => link(url, host),
        UrlEmbed::Html { html } | UrlEmbed::HtmlCard { html } => match iframe_src(html) {
            Some(src) => link(&src, "iframe link"),
            None => format!("\n{}\n\n", escape_html(html)),
        },
        UrlEmbed::FanboxPost(post) => {
            let url = format!(
                "https://www.fanbox.cc/@{}/posts/{}",
                post.creator_id, post.id
            );
            link(&url, &post.title)
        }
        UrlEmbed::Unknown(raw) => json_span(raw),
    }
}

fn iframe_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("iframe[src]").ok()?;
    fragment
        .select(&selector)
        .filter_map(|iframe| iframe.value().attr("src"))
        .find(|src| src.starts_with("http"))
        .map(str::to_string)
}

fn json_span(value: &Value) -> String {
    format!("<span>{}</span>", escape_html(&value.to_string()))
}

fn information(post: &PostInfo, transcript: &str, format: MetadataFormat) -> Information {
    let mut record = json!({
        "postId": post.id,
        "title": post.title,
        "creatorId": post.creator_id,
        "fee": post.fee_required,
        "publishedDatetime": post.published_datetime,
        "updatedDatetime": post.updated_datetime,
        "tags": post.tags,
        "likeCount": post.like_count,
        "commentCount": post.comment_count,
    });

    let text = match format {
        MetadataFormat::Json => {
            if let Value::Object(map) = &mut record {
                map.insert("parsedText".to_string(), Value::from(transcript));
            }
            record.to_string()
        }
        MetadataFormat::KeyValue => {
            let lines = match &record {
                Value::Object(map) => map
                    .iter()
                    .map(|(key, value)| format!("{key}:{value}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => String::new(),
            };
            format!("{lines}\nparsedText:\n{transcript}")
        }
    };

    Information { format, text }
}
