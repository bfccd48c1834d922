//! HTML fragments that make up a post's `index.html` body.

use maud::html;

use crate::unit::FileDescriptor;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

pub fn escape_html(text: &str) -> String {
    html! { (text) }.into_string()
}

/// One `<span>` per line, joined by `<br>`.
pub fn text_lines(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("<span>{}</span>", escape_html(line)))
        .collect::<Vec<_>>()
        .join("<br>\n")
}

/// Thumbnail linking to the archived image.
pub fn image_link(file: &FileDescriptor) -> String {
    html! {
        a href=(file.encoded_name) {
            img src=(file.encoded_name) alt=(file.name);
        }
    }
    .into_string()
}

/// Images render as thumbnails, everything else as a labeled download link.
pub fn file_link(file: &FileDescriptor) -> String {
    if is_image_extension(&file.extension) {
        return image_link(file);
    }
    let label = format!("{}.{}", file.name, file.extension);
    link(&file.encoded_name, &label)
}

pub fn link(url: &str, label: &str) -> String {
    html! {
        a href=(url) { (label) }
    }
    .into_string()
}

fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, extension: &str) -> FileDescriptor {
        FileDescriptor {
            url: "https://example.com/f".to_string(),
            name: name.to_string(),
            extension: extension.to_string(),
            encoded_name: format!("1_{name}.{extension}"),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn file_link_labels_non_images() {
        let html = file_link(&descriptor("notes", "pdf"));
        assert_eq!(html, r#"<a href="1_notes.pdf">notes.pdf</a>"#);
    }

    #[test]
    fn file_link_uses_thumbnail_for_images() {
        let html = file_link(&descriptor("pic", "PNG"));
        assert!(html.contains(r#"<img src="1_pic.PNG""#));
    }
}
