use fanbox_core::{DownloadUnit, PostEntry};
use maud::{html, PreEscaped, DOCTYPE};

const STYLE: &str = "body{font-family:sans-serif;max-width:48em;margin:auto;padding:1em}\
img{max-width:100%}.tags li{display:inline;margin-right:.5em}";

/// Top-level page listing every post of the unit.
pub fn index_page(unit: &DownloadUnit, archived_at: Option<&str>) -> String {
    html! {
        (DOCTYPE)
        html lang="ja" {
            head {
                meta charset="utf-8";
                title { "@" (unit.id) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { a href=(unit.url) { "@" (unit.id) } }
                p { "投稿: " (unit.post_count) " / ファイル: " (unit.file_count) }
                @if let Some(at) = archived_at {
                    p class="archived" { "archived: " (at) }
                }
                @if !unit.tags.is_empty() {
                    ul class="tags" {
                        @for tag in &unit.tags {
                            li { (tag) }
                        }
                    }
                }
                ol class="posts" {
                    @for post in &unit.posts {
                        @let href = format!("{}/index.html", post.encoded_name);
                        li {
                            a href=(href) { (post.title) }
                            @if !post.tags.is_empty() {
                                " "
                                small { (post.tags.join(", ")) }
                            }
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

/// Page of a single post; its body is the pre-rendered post HTML.
pub fn post_page(post: &PostEntry) -> String {
    html! {
        (DOCTYPE)
        html lang="ja" {
            head {
                meta charset="utf-8";
                title { (post.title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                nav { a href="../index.html" { "index" } }
                @if !post.tags.is_empty() {
                    ul class="tags" {
                        @for tag in &post.tags {
                            li { (tag) }
                        }
                    }
                }
                article { (PreEscaped(post.html.as_str())) }
            }
        }
    }
    .into_string()
}
