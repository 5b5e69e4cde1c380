use opml::{Outline, OPML};

use crate::error::{AppError, Result};

/// Extract every `xmlUrl` from an OPML document, walking nested outlines
/// (folders) depth-first so the subscription order is preserved.
pub fn parse_opml(content: &str) -> Result<Vec<String>> {
    let document = OPML::from_str(content).map_err(|e| AppError::Opml(e.to_string()))?;

    let mut urls = Vec::new();
    for outline in &document.body.outlines {
        collect_urls(outline, &mut urls);
    }
    Ok(urls)
}

fn collect_urls(outline: &Outline, urls: &mut Vec<String>) {
    if let Some(url) = &outline.xml_url {
        if !url.trim().is_empty() {
            urls.push(url.trim().to_string());
        }
    }
    for child in &outline.outlines {
        collect_urls(child, urls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Ham Radio" title="Ham Radio">
      <outline type="rss" text="AMSAT" xmlUrl="https://www.amsat.org/feed/"/>
      <outline type="rss" text="QRPer" xmlUrl="https://qrper.com/feed/"/>
    </outline>
    <outline type="rss" text="SWLing" xmlUrl="https://swling.com/blog/feed/"/>
    <outline text="Empty folder"/>
  </body>
</opml>"#;

    #[test]
    fn collects_nested_outline_urls_in_order() {
        let urls = parse_opml(SAMPLE).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.amsat.org/feed/",
                "https://qrper.com/feed/",
                "https://swling.com/blog/feed/",
            ]
        );
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = parse_opml("<opml><body>").unwrap_err();
        assert!(matches!(err, AppError::Opml(_)));
    }

    #[test]
    fn outlines_without_xml_url_are_ignored() {
        let doc = r#"<opml version="2.0"><head/><body>
            <outline text="just a label"/>
        </body></opml>"#;
        assert!(parse_opml(doc).unwrap().is_empty());
    }
}
