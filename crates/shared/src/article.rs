use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Article, Digest, DigestImage};

pub struct ArticleRenderer;

impl ArticleRenderer {
    /// Title for the given day, e.g. "每日简报 2025年08月03日 - 60秒读懂世界"
    pub fn title(now: DateTime<Local>) -> String {
        format!("每日简报 {} - 60秒读懂世界", Self::format_day(now))
    }

    pub fn render(digest: &Digest, image: Option<&DigestImage>, now: DateTime<Local>) -> Article {
        Article {
            title: Self::title(now),
            html_body: Self::generate(digest, image, now),
        }
    }

    fn format_day(now: DateTime<Local>) -> String {
        now.format("%Y年%m月%d日").to_string()
    }

    fn generate(digest: &Digest, image: Option<&DigestImage>, now: DateTime<Local>) -> String {
        let mut html = String::new();

        html.push_str("<div style=\"font-size:16px;line-height:1.8;color:#333;\">\n");

        // Header
        html.push_str("  <div style=\"text-align:center;margin-bottom:30px;\">\n");
        html.push_str(
            "    <h2 style=\"color:#0066cc;margin:0;font-size:24px;\">📰 每日简报</h2>\n",
        );
        html.push_str(&format!(
            "    <p style=\"color:#666;margin:10px 0 0;font-size:14px;\">{} · 60秒读懂世界</p>\n",
            Self::format_day(now)
        ));
        html.push_str("  </div>\n");

        if let Some(image) = image {
            html.push_str("  <div style=\"text-align:center;margin:20px 0;\">\n");
            html.push_str(&format!(
                "    <img src=\"data:{};base64,{}\" alt=\"每日简报\" style=\"max-width:100%;height:auto;border-radius:8px;box-shadow:0 4px 12px rgba(0,0,0,.15);\">\n",
                Self::escape_html(&image.content_type),
                STANDARD.encode(&image.bytes)
            ));
            html.push_str("  </div>\n");
        }

        // Headlines
        html.push_str(
            "  <div style=\"background:#f8f9fa;padding:20px;border-radius:8px;margin:20px 0;\">\n",
        );
        html.push_str(
            "    <h3 style=\"color:#333;margin:0 0 15px;font-size:18px;\">🌍 今日要闻</h3>\n",
        );
        html.push_str("    <ol style=\"margin:0;padding-left:20px;\">\n");
        for (index, headline) in digest.headlines.iter().enumerate() {
            html.push_str(&format!(
                "      <li style=\"margin-bottom:8px;line-height:1.6;\">{}. {}</li>\n",
                index + 1,
                Self::escape_html(headline)
            ));
        }
        html.push_str("    </ol>\n");
        html.push_str("  </div>\n");

        // Quote
        html.push_str("  <div style=\"background:#e8f4fd;padding:15px;border-radius:8px;border-left:4px solid #0066cc;\">\n");
        html.push_str(
            "    <h4 style=\"color:#0066cc;margin:0 0 10px;font-size:16px;\">💭 微语</h4>\n",
        );
        html.push_str(&format!(
            "    <p style=\"margin:0;font-style:italic;color:#555;\">{}</p>\n",
            Self::escape_html(&digest.quote)
        ));
        html.push_str("  </div>\n");

        // Footer
        html.push_str("  <div style=\"text-align:center;margin-top:30px;padding-top:20px;border-top:1px solid #eee;\">\n");
        html.push_str("    <p style=\"color:#999;font-size:12px;margin:0;\">\n");
        html.push_str("      数据来源：ALAPI · 每日简报接口<br>\n");
        html.push_str(&format!(
            "      自动发布时间：{}\n",
            now.format("%Y-%m-%d %H:%M:%S")
        ));
        html.push_str("    </p>\n");
        html.push_str("  </div>\n");

        html.push_str("</div>\n");
        html
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Write the rendered body to `dir` for inspection.
    pub fn save(article: &Article, dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
        let filename = format!("daily-briefing-{}.html", now.format("%Y-%m-%d"));

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        let filepath = dir.join(&filename);

        fs::write(&filepath, &article.html_body).context("Failed to write article file")?;

        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 8, 3, 9, 0, 5).unwrap()
    }

    fn headlines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("headline {}", i)).collect()
    }

    #[test]
    fn test_concrete_scenario() {
        let digest = Digest::new(vec!["A".into(), "B".into()], "Q");
        let article = ArticleRenderer::render(&digest, None, day());

        assert_eq!(article.title, "每日简报 2025年08月03日 - 60秒读懂世界");
        let first = article.html_body.find("1. A").unwrap();
        let second = article.html_body.find("2. B").unwrap();
        assert!(first < second);
        assert!(article.html_body.contains(">Q</p>"));
        assert!(article.html_body.contains("2025年08月03日 · 60秒读懂世界"));
        assert!(article.html_body.contains("自动发布时间：2025-08-03 09:00:05"));
    }

    #[test]
    fn test_one_list_item_per_headline_in_order() {
        for n in [0, 1, 7, 15] {
            let digest = Digest::new(headlines(n), "q");
            let body = ArticleRenderer::render(&digest, None, day()).html_body;

            assert_eq!(body.matches("<li ").count(), n);
            let mut last = 0;
            for (i, headline) in digest.headlines.iter().enumerate() {
                let pos = body.find(&format!("{}. {}</li>", i + 1, headline)).unwrap();
                assert!(pos >= last);
                last = pos;
            }
        }
    }

    #[test]
    fn test_empty_digest_still_renders() {
        let body = ArticleRenderer::render(&Digest::default(), None, day()).html_body;
        assert_eq!(body.matches("<li ").count(), 0);
        assert!(body.contains("<ol"));
        assert!(body.contains("font-style:italic;color:#555;\"></p>"));
    }

    #[test]
    fn test_markup_in_headlines_is_escaped() {
        let digest = Digest::new(vec!["<script>alert('x')</script> & more".into()], "\"hi\"");
        let body = ArticleRenderer::render(&digest, None, day()).html_body;

        assert!(!body.contains("<script>"));
        assert!(body.contains("1. &lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(body.contains("&quot;hi&quot;"));
    }

    #[test]
    fn test_image_block_only_when_present() {
        let digest = Digest::new(headlines(2), "q");
        let without = ArticleRenderer::render(&digest, None, day()).html_body;
        assert!(!without.contains("<img"));

        let image = DigestImage {
            content_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        };
        let with = ArticleRenderer::render(&digest, Some(&image), day()).html_body;
        assert!(with.contains("<img src=\"data:image/png;base64,cG5n\""));
    }

    #[test]
    fn test_save_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let article = ArticleRenderer::render(&Digest::new(headlines(1), "q"), None, day());

        let path = ArticleRenderer::save(&article, dir.path(), day()).unwrap();

        assert_eq!(path.file_name().unwrap(), "daily-briefing-2025-08-03.html");
        assert_eq!(fs::read_to_string(path).unwrap(), article.html_body);
    }
}
