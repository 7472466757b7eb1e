//! Gemini protocol client.
//!
//! Turns an [`Images`] batch into one `generateContent` call. Small batches
//! travel inline as base64; batches over [`INLINE_PAYLOAD_LIMIT`] (or every
//! batch, with `force_upload`) go through the Files API first and are
//! referenced by URI. Uploads are skipped for content the Files API already
//! holds, matched by content hash.

use std::collections::HashMap;

use tracing::{debug, info};

use super::schemas::{
    GenerateContentRequest, GenerateContentResponse, ModelList, Part, UploadMetadata,
    FINISH_REASON_STOP,
};
use super::{Chatbot, DescribeFuture};
use crate::config::GeminiConfig;
use crate::error::Error;
use crate::image::MIME_TYPE;
use crate::images::Images;
use crate::ports::GeminiApi;
use crate::schemas::ImageDescription;

/// Largest total encoded size sent inline (20 MiB).
pub const INLINE_PAYLOAD_LIMIT: u64 = 20 * 1024 * 1024;

/// How images travel to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Base64 bytes inside the request.
    Inline,
    /// Uploaded first, referenced by URI.
    Upload,
}

impl TransportMode {
    /// Inline up to and including the limit, upload above it or when forced.
    #[must_use]
    pub fn choose(total_size: u64, force_upload: bool) -> Self {
        if force_upload || total_size > INLINE_PAYLOAD_LIMIT {
            Self::Upload
        } else {
            Self::Inline
        }
    }
}

/// Gemini client. Holds the config and the transport; safe to reuse for
/// many sequential requests.
pub struct GeminiClient {
    config: GeminiConfig,
    api: Box<dyn GeminiApi>,
}

impl GeminiClient {
    /// Client over the given transport.
    #[must_use]
    pub fn new(config: GeminiConfig, api: Box<dyn GeminiApi>) -> Self {
        Self { config, api }
    }

    /// The config this client was built with.
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Models offered by the API that this library supports.
    ///
    /// Being listed does not mean the model is enabled for the API key.
    ///
    /// # Errors
    ///
    /// Returns a transport error if a listing call fails.
    pub async fn available_models(&self) -> Result<ModelList, Error> {
        let mut all = ModelList::default();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.api.list_models(page_token.as_deref()).await?;
            all.models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(all.supported_models())
    }

    /// Content hash to URI of every file already in Files API storage.
    async fn uploaded_files(&self) -> Result<HashMap<String, String>, Error> {
        let mut by_hash = HashMap::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.api.list_files(page_token.as_deref()).await?;
            for file in page.files {
                if let (Some(hash), Some(uri)) = (file.sha256_hash, file.uri) {
                    by_hash.entry(hash).or_insert(uri);
                }
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(by_hash)
    }

    /// Two-phase upload; returns the file URI.
    async fn upload_image(&self, data: &[u8], display_name: &str) -> Result<String, Error> {
        let metadata = UploadMetadata {
            display_name: display_name.to_string(),
            mime_type: MIME_TYPE.to_string(),
            content_length: data.len() as u64,
        };
        let upload_url = self.api.start_upload(&metadata).await?;
        let file = self.api.finish_upload(&upload_url, data).await?;
        file.uri.ok_or_else(|| Error::Chatbot(format!("Upload of {display_name} returned no file URI")))
    }

    /// File reference parts for every image, uploading what is missing.
    async fn upload_parts(&self, images: &Images) -> Result<Vec<Part>, Error> {
        let mut known = self.uploaded_files().await?;
        let mut parts = Vec::with_capacity(images.len());

        for img in images {
            let data = img.encode()?;
            let hash = crate::image::content_hash(&data);
            let uri = if let Some(uri) = known.get(&hash) {
                debug!(image = %img.filename(), "image already uploaded, reusing uri");
                uri.clone()
            } else {
                debug!(image = %img.filename(), "image not on the server, uploading");
                let uri = self.upload_image(&data, &img.filename()).await?;
                known.insert(hash, uri.clone());
                uri
            };
            parts.push(Part::file_jpeg(uri));
        }
        Ok(parts)
    }

    async fn describe(&self, images: &Images) -> Result<Vec<ImageDescription>, Error> {
        let model = self.config.model_name.as_ref().ok_or(Error::ModelRequired)?;

        if images.is_empty() {
            return Err(Error::Chatbot("No images to describe".into()));
        }
        if images.len() > self.config.max_image_count {
            return Err(Error::Chatbot(format!(
                "Max image count is {}, but got {}. Adjust max_image_count in the config if the \
                 provider limit changed.",
                self.config.max_image_count,
                images.len()
            )));
        }

        let total_size = images.calculate_total_size()?;
        debug!(total_size, "total image size");

        let mut parts = vec![Part::text(&self.config.image_description_prompt)];
        match TransportMode::choose(total_size, self.config.force_upload) {
            TransportMode::Inline => {
                parts.extend(images.encode_base64_all()?.into_iter().map(Part::inline_jpeg));
            }
            TransportMode::Upload => {
                info!(total_size, forced = self.config.force_upload, "uploading images to file storage");
                parts.extend(self.upload_parts(images).await?);
            }
        }

        let request = GenerateContentRequest::json(parts);
        let response = self.api.generate_content(&model.name, &request).await?;
        if let Some(usage) = &response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "token usage"
            );
        }

        let descriptions = parse_descriptions(response)?;
        if descriptions.len() != images.len() {
            return Err(Error::DescriptionCountMismatch {
                expected: images.len(),
                actual: descriptions.len(),
            });
        }
        Ok(descriptions)
    }
}

impl Chatbot for GeminiClient {
    fn generate_image_description<'a>(&'a self, images: &'a Images) -> DescribeFuture<'a> {
        Box::pin(self.describe(images))
    }
}

/// Check the first candidate and parse its text as a description list.
///
/// # Errors
///
/// [`Error::Chatbot`] if there is no candidate, it did not finish with
/// `STOP`, or it has no text; [`Error::Parse`] if the text does not match
/// the description schema.
pub fn parse_descriptions(response: GenerateContentResponse) -> Result<Vec<ImageDescription>, Error> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Chatbot("Gemini returned no candidates".into()))?;

    match candidate.finish_reason.as_deref() {
        Some(FINISH_REASON_STOP) => {}
        other => {
            return Err(Error::Chatbot(format!(
                "Gemini stopped generating tokens: {}",
                other.unwrap_or("no finish reason")
            )));
        }
    }

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| Error::Chatbot("Gemini candidate has no text".into()))?;

    serde_json::from_str(&text).map_err(Error::Parse)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chatbot::schemas::{Candidate, CandidateContent, CandidatePart, Model, RemoteFile};
    use crate::error::ErrorKind;
    use crate::model::ModelName;
    use crate::ports::gemini_api::fake::FakeGeminiApi;
    use crate::ports::ApiFuture;
    use crate::test_support::write_test_jpeg;

    /// Lets a test keep a handle on the fake after the client takes it.
    struct Shared(Arc<FakeGeminiApi>);

    impl GeminiApi for Shared {
        fn list_models<'a>(&'a self, t: Option<&'a str>) -> ApiFuture<'a, ModelList> {
            self.0.list_models(t)
        }
        fn list_files<'a>(
            &'a self,
            t: Option<&'a str>,
        ) -> ApiFuture<'a, crate::chatbot::schemas::FileList> {
            self.0.list_files(t)
        }
        fn start_upload<'a>(&'a self, m: &'a UploadMetadata) -> ApiFuture<'a, String> {
            self.0.start_upload(m)
        }
        fn finish_upload<'a>(&'a self, u: &'a str, d: &'a [u8]) -> ApiFuture<'a, RemoteFile> {
            self.0.finish_upload(u, d)
        }
        fn generate_content<'a>(
            &'a self,
            m: &'a str,
            r: &'a GenerateContentRequest,
        ) -> ApiFuture<'a, GenerateContentResponse> {
            self.0.generate_content(m, r)
        }
    }

    fn answer(text: &str, finish_reason: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![CandidatePart { text: Some(text.to_string()) }],
                    role: Some("model".into()),
                }),
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage_metadata: None,
        }
    }

    const TWO: &str =
        r#"[{"description":"d1","keywords":["k1"]},{"description":"d2","keywords":["k2"]}]"#;

    fn config() -> GeminiConfig {
        GeminiConfig::new("test-key").with_model(ModelName::resolve("flash").unwrap())
    }

    fn client(config: GeminiConfig, fake: FakeGeminiApi) -> (GeminiClient, Arc<FakeGeminiApi>) {
        let fake = Arc::new(fake);
        (GeminiClient::new(config, Box::new(Shared(Arc::clone(&fake)))), fake)
    }

    fn two_images(dir: &std::path::Path) -> Images {
        let a = write_test_jpeg(dir, "a.jpg", 64, 64);
        let b = write_test_jpeg(dir, "b.jpg", 48, 80);
        Images::load(&[a, b]).unwrap()
    }

    #[test]
    fn threshold_boundary() {
        assert_eq!(TransportMode::choose(INLINE_PAYLOAD_LIMIT, false), TransportMode::Inline);
        assert_eq!(TransportMode::choose(INLINE_PAYLOAD_LIMIT + 1, false), TransportMode::Upload);
        assert_eq!(TransportMode::choose(0, true), TransportMode::Upload);
        assert_eq!(TransportMode::choose(5 * 1024 * 1024, false), TransportMode::Inline);
    }

    #[tokio::test]
    async fn model_required_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let (client, fake) = client(GeminiConfig::new("k"), FakeGeminiApi::default());

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelRequired);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn too_many_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let config = GeminiConfig { max_image_count: 1, ..config() };
        let (client, fake) = client(config, FakeGeminiApi::default());

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert!(matches!(err, Error::Chatbot(ref m) if m.contains("Max image count is 1")));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn inline_mode_sends_prompt_then_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi::default().with_response(Ok(answer(TWO, "STOP")));
        let (client, fake) = client(config(), fake);

        let descriptions = client.generate_image_description(&images).await.unwrap();
        assert_eq!(descriptions[0].description, "d1");
        assert_eq!(descriptions[1].keywords, vec!["k2"]);
        assert_eq!(fake.calls(), vec!["generate_content"]);

        let request = fake.last_request().unwrap();
        let parts = request.parts();
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], Part::Text { text } if *text == client.config().image_description_prompt));
        let encoded = images.encode_base64_all().unwrap();
        for (part, data) in parts[1..].iter().zip(&encoded) {
            assert!(matches!(part, Part::InlineData { inline_data } if inline_data.data == *data));
        }
        assert_eq!(request.generation_config.response_mime_type, "application/json");
    }

    #[tokio::test]
    async fn force_upload_uploads_every_new_image() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi::default().with_response(Ok(answer(TWO, "STOP")));
        let (client, fake) = client(GeminiConfig { force_upload: true, ..config() }, fake);

        client.generate_image_description(&images).await.unwrap();

        let uploads = fake.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].display_name, "a.jpg");
        assert_eq!(uploads[0].mime_type, "image/jpeg");
        assert_eq!(uploads[0].content_length, images.iter().next().unwrap().size_bytes().unwrap());

        let request = fake.last_request().unwrap();
        let uris: Vec<_> = request.parts()[1..]
            .iter()
            .map(|p| match p {
                Part::FileData { file_data } => file_data.file_uri.clone(),
                other => panic!("expected file part, got {other:?}"),
            })
            .collect();
        assert_eq!(uris, ["https://files.test/1", "https://files.test/2"]);
    }

    #[tokio::test]
    async fn upload_reuses_existing_files_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let first = images.iter().next().unwrap();
        let fake = FakeGeminiApi {
            files: vec![RemoteFile {
                uri: Some("https://files.test/existing".into()),
                sha256_hash: Some(first.sha256_hash().unwrap()),
                ..RemoteFile::default()
            }],
            ..FakeGeminiApi::default()
        }
        .with_response(Ok(answer(TWO, "STOP")));
        let (client, fake) = client(GeminiConfig { force_upload: true, ..config() }, fake);

        client.generate_image_description(&images).await.unwrap();

        assert_eq!(fake.uploads().len(), 1);
        assert_eq!(fake.uploads()[0].display_name, "b.jpg");
        let request = fake.last_request().unwrap();
        assert!(matches!(&request.parts()[1],
            Part::FileData { file_data } if file_data.file_uri == "https://files.test/existing"));
    }

    #[tokio::test]
    async fn same_content_twice_uploads_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_test_jpeg(dir.path(), "a.jpg", 40, 40);
        let images = Images::load(&[&a, &a]).unwrap();
        let fake = FakeGeminiApi::default().with_response(Ok(answer(TWO, "STOP")));
        let (client, fake) = client(GeminiConfig { force_upload: true, ..config() }, fake);

        client.generate_image_description(&images).await.unwrap();

        assert_eq!(fake.uploads().len(), 1);
        let request = fake.last_request().unwrap();
        assert_eq!(request.parts()[1], request.parts()[2]);
    }

    #[tokio::test]
    async fn upload_without_uri_is_chatbot_error() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi { omit_upload_uri: true, ..FakeGeminiApi::default() };
        let (client, fake) = client(GeminiConfig { force_upload: true, ..config() }, fake);

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Chatbot);
        assert!(!fake.calls().contains(&"generate_content".to_string()));
    }

    #[tokio::test]
    async fn payload_too_large_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi::default().with_response(Err(Error::from_status(413, "too big")));
        let (client, _) = client(config(), fake);

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert!(err.is_payload_too_large());
    }

    #[tokio::test]
    async fn server_error_is_transport_not_payload() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi::default().with_response(Err(Error::from_status(500, "oops")));
        let (client, _) = client(config(), fake);

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_payload_too_large());
    }

    #[tokio::test]
    async fn safety_stop_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let fake = FakeGeminiApi::default().with_response(Ok(answer("[]", "SAFETY")));
        let (client, _) = client(config(), fake);

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert!(matches!(err, Error::Chatbot(ref m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn wrong_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let images = two_images(dir.path());
        let one = r#"[{"description":"d1","keywords":[]}]"#;
        let fake = FakeGeminiApi::default().with_response(Ok(answer(one, "STOP")));
        let (client, _) = client(config(), fake);

        let err = client.generate_image_description(&images).await.unwrap_err();
        assert!(matches!(err, Error::DescriptionCountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn parse_rejects_empty_and_malformed() {
        let empty = GenerateContentResponse::default();
        assert_eq!(parse_descriptions(empty).unwrap_err().kind(), ErrorKind::Chatbot);

        let no_reason = GenerateContentResponse {
            candidates: vec![Candidate { finish_reason: None, ..answer(TWO, "STOP").candidates[0].clone() }],
            usage_metadata: None,
        };
        assert_eq!(parse_descriptions(no_reason).unwrap_err().kind(), ErrorKind::Chatbot);

        let truncated = answer("[{\"description\":", "MAX_TOKENS");
        assert_eq!(parse_descriptions(truncated).unwrap_err().kind(), ErrorKind::Chatbot);

        let wrong_shape = answer(r#"{"description":"d"}"#, "STOP");
        assert_eq!(parse_descriptions(wrong_shape).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn available_models_are_filtered() {
        let fake = FakeGeminiApi {
            models: ModelList {
                models: vec![
                    Model {
                        name: "models/gemini-1.5-flash".into(),
                        display_name: None,
                        input_token_limit: None,
                        output_token_limit: None,
                        supported_generation_methods: vec!["generateContent".into()],
                    },
                    Model {
                        name: "models/embedding-001".into(),
                        display_name: None,
                        input_token_limit: None,
                        output_token_limit: None,
                        supported_generation_methods: vec!["embedContent".into()],
                    },
                ],
                next_page_token: None,
            },
            ..FakeGeminiApi::default()
        };
        let (client, _) = client(config(), fake);

        let models = client.available_models().await.unwrap();
        assert_eq!(models.models.len(), 1);
        assert_eq!(models.models[0].name, "models/gemini-1.5-flash");
    }
}
