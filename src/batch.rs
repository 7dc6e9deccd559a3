use crate::{
    data_uri,
    error::BatchError,
    imagen::{ImageCall, ImageProvider},
};

/// Most images a single provider call may ask for.
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;

/// Issue exactly one provider call and flatten its answer into data URIs.
///
/// Callers keep `count` within [`MAX_IMAGES_PER_REQUEST`]. Nothing is
/// cached or retried here.
pub async fn request_batch(
    provider: &dyn ImageProvider,
    credential: &str,
    prompt: &str,
    model: &str,
    count: u32,
) -> Result<Vec<String>, BatchError> {
    if credential.is_empty() {
        return Err(BatchError::MissingCredential);
    }
    debug_assert!(
        (1..=MAX_IMAGES_PER_REQUEST).contains(&count),
        "batch size {} outside 1..={}",
        count,
        MAX_IMAGES_PER_REQUEST
    );

    let images = provider
        .generate_images(ImageCall {
            credential,
            prompt,
            model,
            count,
        })
        .await?;

    if images.is_empty() {
        return Err(BatchError::EmptyResult);
    }

    images
        .iter()
        .enumerate()
        .map(|(index, image)| match image.bytes_base64.as_deref() {
            Some(payload) if !payload.is_empty() => {
                Ok(data_uri::wrap(image.mime_type.as_deref(), payload))
            }
            _ => {
                if let Some(reason) = &image.filtered_reason {
                    log::warn!("Image #{} was filtered by the provider: {}", index + 1, reason);
                }
                Err(BatchError::MissingImageData { position: index + 1 })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagen::{MockProvider, MockReply};
    use crate::models::GeneratedImage;

    const MODEL: &str = "imagen-3.0-generate-002";

    #[tokio::test]
    async fn test_empty_credential_never_calls_provider() {
        let mock = MockProvider::new();
        let result = request_batch(&mock, "", "a treasure map", MODEL, 4).await;

        assert_eq!(result, Err(BatchError::MissingCredential));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_one_call_in_provider_order() {
        let mock = MockProvider::labeled();
        let images = request_batch(&mock, "key", "a treasure map", MODEL, 3).await.unwrap();

        assert_eq!(
            images,
            vec![
                "data:image/png;base64,1",
                "data:image/png;base64,2",
                "data:image/png;base64,3",
            ]
        );
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].count, 3);
        assert_eq!(calls[0].prompt, "a treasure map");
        assert_eq!(calls[0].model, MODEL);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let mock = MockProvider::new();
        mock.push_reply(MockReply::Images(vec![]));

        let result = request_batch(&mock, "key", "a flag waving", MODEL, 4).await;
        assert_eq!(result, Err(BatchError::EmptyResult));
    }

    #[tokio::test]
    async fn test_missing_payload_reports_position() {
        let mock = MockProvider::new();
        mock.push_reply(MockReply::Images(vec![
            GeneratedImage::png("AAAA"),
            GeneratedImage::png("BBBB"),
            GeneratedImage::missing(),
            GeneratedImage::png("DDDD"),
        ]));

        let result = request_batch(&mock, "key", "an explosion effect", MODEL, 4).await;
        assert_eq!(result, Err(BatchError::MissingImageData { position: 3 }));
    }

    #[tokio::test]
    async fn test_filtered_image_is_missing_data() {
        let mock = MockProvider::new();
        mock.push_reply(MockReply::Images(vec![
            GeneratedImage::png("AAAA"),
            GeneratedImage {
                filtered_reason: Some("Unable to show generated images.".into()),
                ..GeneratedImage::missing()
            },
        ]));

        let result = request_batch(&mock, "key", "a goblin thief", MODEL, 2).await;
        assert_eq!(result, Err(BatchError::MissingImageData { position: 2 }));
    }

    #[tokio::test]
    async fn test_provider_mime_is_kept() {
        let mock = MockProvider::new();
        mock.push_reply(MockReply::Images(vec![GeneratedImage {
            bytes_base64: Some("QUJD".into()),
            mime_type: Some("image/webp".into()),
            filtered_reason: None,
        }]));

        let images = request_batch(&mock, "key", "a coin spinning", MODEL, 1).await.unwrap();
        assert_eq!(images, vec!["data:image/webp;base64,QUJD"]);
    }

    #[tokio::test]
    async fn test_raw_provider_error_is_passed_up() {
        let mock = MockProvider::new();
        mock.push_failure(BatchError::provider("[503 UNAVAILABLE] try later"));

        let result = request_batch(&mock, "key", "a healing potion", MODEL, 2).await;
        assert_eq!(result, Err(BatchError::provider("[503 UNAVAILABLE] try later")));
    }
}
