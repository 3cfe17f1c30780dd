use verso_types::{BlobId, SiteId};

/// What a renderer knows about the version being displayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderContext {
    pub site: SiteId,
    pub blob_id: BlobId,
    pub is_logged_in: bool,
}

impl RenderContext {
    /// Historical versions are always rendered as for a logged-in owner,
    /// whoever is viewing them.
    pub fn historical(site: SiteId, blob_id: BlobId) -> Self {
        Self {
            site,
            blob_id,
            is_logged_in: true,
        }
    }
}

/// Turns stored content into a displayable page.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, content: &[u8], context: &RenderContext) -> String;
}

/// Serves stored HTML as-is. Invalid UTF-8 is replaced, not rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlPassthrough;

impl ContentRenderer for HtmlPassthrough {
    fn render(&self, content: &[u8], _context: &RenderContext) -> String {
        String::from_utf8_lossy(content).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_keeps_html() {
        let ctx = RenderContext::historical(SiteId::new("notes").unwrap(), BlobId::generate());
        assert!(ctx.is_logged_in);
        assert_eq!(HtmlPassthrough.render(b"<p>hi</p>", &ctx), "<p>hi</p>");
        assert_eq!(HtmlPassthrough.render(&[0x66, 0xff], &ctx), "f\u{fffd}");
    }
}
