// src/normalize/images.rs

//! Image extraction and feature image selection.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{Image, ImageHostFix};
use crate::utils::resolve_url;

static IMAGE_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img, figure, a[href]").expect("valid image selector"));

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "tif", "tiff",
];

/// Minimum declared width for a body image to represent the post.
const FEATURE_MIN_WIDTH: u32 = 200;

/// Collect images from `<img>`, `<figure>` and image-linking `<a>` elements.
///
/// Relative sources resolve against `base`. Anchor and figure sources must
/// carry an image extension; `<img>` sources are trusted.
pub fn extract_images(html: &str, base: &str, host_fixes: &[ImageHostFix]) -> Vec<Image> {
    let base = Url::parse(base).ok();
    let fragment = Html::parse_fragment(html);
    let mut images: Vec<Image> = Vec::new();

    for element in fragment.select(&IMAGE_ELEMENTS) {
        let Some(mut image) = image_from_element(element) else {
            continue;
        };
        if image.src.starts_with("data:") {
            continue;
        }
        if let Some(base) = &base {
            image.src = resolve_url(base, &image.src);
        }
        image.src = fix_image_host(&image.src, host_fixes);

        if !images.iter().any(|i| i.src == image.src) {
            images.push(image);
        }
    }
    images
}

fn image_from_element(element: ElementRef<'_>) -> Option<Image> {
    let attrs = element.value();
    match attrs.name() {
        "img" => {
            let src = attrs.attr("src").or_else(|| attrs.attr("data-src"))?;
            Some(Image {
                src: src.trim().to_string(),
                srcset: attrs.attr("srcset").map(String::from),
                width: attrs.attr("width").and_then(parse_dimension),
                height: attrs.attr("height").and_then(parse_dimension),
                alt: attrs
                    .attr("alt")
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from),
            })
        }
        "figure" => {
            let src = attrs
                .attr("data-orig-file")
                .or_else(|| attrs.attr("data-src"))?;
            has_image_extension(src).then(|| Image {
                src: src.trim().to_string(),
                ..Image::default()
            })
        }
        "a" => {
            let href = attrs.attr("href")?;
            has_image_extension(href).then(|| Image {
                src: href.trim().to_string(),
                ..Image::default()
            })
        }
        _ => None,
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.trim().trim_end_matches("px").parse().ok()
}

/// Whether the URL path ends in a known raster or vector extension.
pub fn has_image_extension(src: &str) -> bool {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Insert the path prefix a host expects when the source lacks it.
pub fn fix_image_host(src: &str, host_fixes: &[ImageHostFix]) -> String {
    let Ok(mut url) = Url::parse(src) else {
        return src.to_string();
    };
    let Some(fix) = host_fixes
        .iter()
        .find(|f| url.host_str() == Some(f.host.as_str()))
    else {
        return src.to_string();
    };
    if url.path().starts_with(&fix.path_prefix) {
        return src.to_string();
    }

    let path = format!(
        "{}{}",
        fix.path_prefix.trim_end_matches('/'),
        url.path()
    );
    url.set_path(&path);
    url.to_string()
}

/// Choose the post's representative image.
///
/// Platform media wins, then a feed-supplied thumbnail, then the first body
/// image declared at least 200 pixels wide. Boilerplate sources never win.
pub fn pick_feature_image(
    media: Option<&str>,
    thumbnail: Option<&str>,
    images: &[Image],
    boilerplate: &[String],
) -> Option<String> {
    let usable = |src: &&str| !src.is_empty() && !boilerplate.iter().any(|b| b == src);

    media
        .filter(usable)
        .or_else(|| thumbnail.filter(usable))
        .map(String::from)
        .or_else(|| {
            images
                .iter()
                .filter(|i| usable(&i.src.as_str()))
                .find(|i| i.width.is_some_and(|w| w >= FEATURE_MIN_WIDTH))
                .map(|i| i.src.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_img_figure_and_linked_images() {
        let html = r#"
<figure data-orig-file="/files/fig1.png"><img src="/files/fig1-small.png" width="300" alt=" Figure 1 "></figure>
<a href="https://cdn.example/photo.JPG">photo</a>
<a href="https://example.org/article">article</a>
<img src="data:image/png;base64,AAAA">"#;

        let images = extract_images(html, "https://blog.example/2024/post/", &[]);
        let srcs: Vec<&str> = images.iter().map(|i| i.src.as_str()).collect();

        assert_eq!(
            srcs,
            vec![
                "https://blog.example/files/fig1.png",
                "https://blog.example/files/fig1-small.png",
                "https://cdn.example/photo.JPG",
            ]
        );
        assert_eq!(images[1].width, Some(300));
        assert_eq!(images[1].alt.as_deref(), Some("Figure 1"));
    }

    #[test]
    fn host_fix_inserts_missing_prefix() {
        let fixes = vec![ImageHostFix {
            host: "archive.example".into(),
            path_prefix: "/images/".into(),
        }];
        assert_eq!(
            fix_image_host("https://archive.example/2024/a%20b.png", &fixes),
            "https://archive.example/images/2024/a%20b.png"
        );
        assert_eq!(
            fix_image_host("https://archive.example/images/x.png", &fixes),
            "https://archive.example/images/x.png"
        );
        assert_eq!(
            fix_image_host("https://other.example/x.png", &fixes),
            "https://other.example/x.png"
        );
    }

    #[test]
    fn feature_image_preference_order() {
        let images = vec![
            Image {
                src: "https://b.example/small.png".into(),
                width: Some(100),
                ..Image::default()
            },
            Image {
                src: "https://b.example/wide.png".into(),
                width: Some(800),
                ..Image::default()
            },
        ];
        let boilerplate = vec!["https://s0.wp.com/i/buttonw-com.png".to_string()];

        assert_eq!(
            pick_feature_image(Some("https://m.example/a.png"), Some("https://t.example/b.png"), &images, &boilerplate)
                .as_deref(),
            Some("https://m.example/a.png")
        );
        assert_eq!(
            pick_feature_image(None, Some("https://t.example/b.png"), &images, &boilerplate).as_deref(),
            Some("https://t.example/b.png")
        );
        assert_eq!(
            pick_feature_image(Some("https://s0.wp.com/i/buttonw-com.png"), None, &images, &boilerplate)
                .as_deref(),
            Some("https://b.example/wide.png")
        );
        assert_eq!(pick_feature_image(None, None, &images[..1], &boilerplate), None);
    }

    #[test]
    fn extension_check_ignores_query() {
        assert!(has_image_extension("https://x.example/a.webp?w=600"));
        assert!(!has_image_extension("https://x.example/page.html"));
    }
}
