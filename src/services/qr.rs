/// Builds the public tracking URL and the QR image reference for a code.
///
/// The template carries a `{url}` placeholder which receives the
/// URL-encoded tracking URL. Images are rendered elsewhere.
#[derive(Debug, Clone)]
pub struct QrUrlBuilder {
    template: String,
}

impl QrUrlBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn tracking_url(base_url: &str, code: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), code)
    }

    pub fn build(&self, base_url: &str, code: &str) -> String {
        let url = Self::tracking_url(base_url, code);
        self.template
            .replace("{url}", &urlencoding::encode(&url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_qr_url() {
        let qr = QrUrlBuilder::new("https://qr.example/?data={url}");
        assert_eq!(
            qr.build("https://tax.example/", "jane-doe"),
            "https://qr.example/?data=https%3A%2F%2Ftax.example%2Fjane-doe"
        );
    }

    #[test]
    fn test_tracking_url_trims_slash() {
        assert_eq!(
            QrUrlBuilder::tracking_url("http://localhost:8080/", "abc123"),
            "http://localhost:8080/abc123"
        );
    }
}
