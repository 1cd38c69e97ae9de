//! Picker-to-upload composition.

use std::sync::Arc;

use blobdrop_transfer::{
    BatchFileDescriptor, BatchObserver, BlobUploader, UploadProgress, UploadResult,
    UploaderConfig,
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    Capability, MediaError, MediaPicker, PermissionGate, PermissionSnapshot, PickerOptions,
    PickerOutcome, Platform,
};

/// Media acquisition on top of a [`BlobUploader`].
///
/// Permission calls pass through to the host gate, except on
/// [`Platform::Web`] where every capability is granted without asking.
pub struct MediaUploader {
    uploader: BlobUploader,
    platform: Platform,
    gate: Arc<dyn PermissionGate>,
    picker: Arc<dyn MediaPicker>,
}

impl MediaUploader {
    /// Builds the default [`BlobUploader`] from `config`.
    pub fn new(
        config: UploaderConfig,
        platform: Platform,
        gate: Arc<dyn PermissionGate>,
        picker: Arc<dyn MediaPicker>,
    ) -> Result<Self, MediaError> {
        let uploader = BlobUploader::new(config)?;
        Ok(Self::with_uploader(uploader, platform, gate, picker))
    }

    pub fn with_uploader(
        uploader: BlobUploader,
        platform: Platform,
        gate: Arc<dyn PermissionGate>,
        picker: Arc<dyn MediaPicker>,
    ) -> Self {
        Self {
            uploader,
            platform,
            gate,
            picker,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The underlying engine.
    pub fn uploader(&self) -> &BlobUploader {
        &self.uploader
    }

    pub fn uploader_mut(&mut self) -> &mut BlobUploader {
        &mut self.uploader
    }

    /// Replaces the SAS token used by subsequent uploads.
    pub fn update_access_token(&mut self, token: impl Into<String>) -> Result<(), MediaError> {
        Ok(self.uploader.update_access_token(token)?)
    }

    pub async fn request_media_library_permission(&self) -> bool {
        self.request(Capability::MediaLibrary).await
    }

    pub async fn request_camera_permission(&self) -> bool {
        self.request(Capability::Camera).await
    }

    /// Current permission state for both capabilities, without prompting.
    pub async fn check_permissions(&self) -> PermissionSnapshot {
        if !self.platform.requires_permissions() {
            return PermissionSnapshot {
                camera: true,
                media_library: true,
            };
        }

        let camera = self.gate.status(Capability::Camera).await;
        let media_library = self.gate.status(Capability::MediaLibrary).await;
        PermissionSnapshot {
            camera,
            media_library,
        }
    }

    /// Picks one image. Defaults to [`PickerOptions::single_image`].
    pub async fn pick_image_from_library(
        &self,
        options: Option<PickerOptions>,
    ) -> Result<PickerOutcome, MediaError> {
        self.require(Capability::MediaLibrary).await?;
        let options = options.unwrap_or_else(PickerOptions::single_image);
        self.picker.launch_library(&options).await
    }

    /// Picks several images. Defaults to [`PickerOptions::multiple_images`].
    pub async fn pick_multiple_images(
        &self,
        options: Option<PickerOptions>,
    ) -> Result<PickerOutcome, MediaError> {
        self.require(Capability::MediaLibrary).await?;
        let options = options.unwrap_or_else(PickerOptions::multiple_images);
        self.picker.launch_library(&options).await
    }

    /// Captures a photo. Defaults to [`PickerOptions::camera`].
    pub async fn take_photo(
        &self,
        options: Option<PickerOptions>,
    ) -> Result<PickerOutcome, MediaError> {
        self.require(Capability::Camera).await?;
        let options = options.unwrap_or_else(PickerOptions::camera);
        self.picker.launch_camera(&options).await
    }

    /// Uploads the first selected asset as `file_name`.
    ///
    /// Returns `None` when the outcome was canceled or empty. With a progress
    /// callback the upload is streamed.
    pub async fn process_and_upload_one(
        &self,
        outcome: &PickerOutcome,
        file_name: &str,
        on_progress: Option<&mut dyn FnMut(UploadProgress)>,
    ) -> Option<UploadResult> {
        let asset = outcome.selection()?.first()?;
        let kind = asset.media_kind();

        let result = match on_progress {
            Some(on_progress) => {
                self.uploader
                    .upload_with_progress(&asset.uri, file_name, kind, on_progress)
                    .await
            }
            None => self.uploader.upload_file(&asset.uri, file_name, kind).await,
        };
        Some(result)
    }

    /// Uploads every selected asset as a batch.
    ///
    /// Files are named `{prefix}-{n}-{millis}.{ext}` with `n` starting at 1.
    /// Returns `None` when the outcome was canceled or empty.
    pub async fn process_and_upload_many<O>(
        &self,
        outcome: &PickerOutcome,
        prefix: &str,
        observer: &mut O,
    ) -> Option<Vec<UploadResult>>
    where
        O: BatchObserver + ?Sized,
    {
        let assets = outcome.selection()?;
        let millis = Utc::now().timestamp_millis();

        let files: Vec<BatchFileDescriptor> = assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let ext = asset.extension().unwrap_or("jpg");
                BatchFileDescriptor::new(
                    asset.uri.clone(),
                    format!("{prefix}-{}-{millis}.{ext}", i + 1),
                )
                .with_kind(asset.media_kind())
            })
            .collect();

        debug!(count = files.len(), prefix, "uploading picked assets");
        Some(self.uploader.upload_batch(&files, observer).await)
    }

    /// Picks one image and uploads it. `file_name` defaults to
    /// `image-{millis}.jpg`.
    pub async fn quick_upload_from_library(
        &self,
        file_name: Option<&str>,
        options: Option<PickerOptions>,
        on_progress: Option<&mut dyn FnMut(UploadProgress)>,
    ) -> Result<Option<UploadResult>, MediaError> {
        let outcome = self.pick_image_from_library(options).await?;
        let name = default_name(file_name, "image");
        Ok(self
            .process_and_upload_one(&outcome, &name, on_progress)
            .await)
    }

    /// Captures a photo and uploads it. `file_name` defaults to
    /// `photo-{millis}.jpg`.
    pub async fn quick_upload_from_camera(
        &self,
        file_name: Option<&str>,
        options: Option<PickerOptions>,
        on_progress: Option<&mut dyn FnMut(UploadProgress)>,
    ) -> Result<Option<UploadResult>, MediaError> {
        let outcome = self.take_photo(options).await?;
        let name = default_name(file_name, "photo");
        Ok(self
            .process_and_upload_one(&outcome, &name, on_progress)
            .await)
    }

    async fn request(&self, capability: Capability) -> bool {
        if !self.platform.requires_permissions() {
            return true;
        }
        let granted = self.gate.request(capability).await;
        debug!(%capability, granted, "permission requested");
        granted
    }

    async fn require(&self, capability: Capability) -> Result<(), MediaError> {
        if self.request(capability).await {
            Ok(())
        } else {
            warn!(%capability, "permission denied");
            Err(MediaError::PermissionDenied(capability))
        }
    }
}

fn default_name(file_name: Option<&str>, stem: &str) -> String {
    match file_name {
        Some(name) => name.to_string(),
        None => format!("{stem}-{}.jpg", Utc::now().timestamp_millis()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use blobdrop_transfer::{
        BatchEvent, BlobTransport, LocalFileSource, MediaKind, PutBody, PutRequest,
        TransportError, TransportResponse,
    };
    use futures_util::StreamExt;

    use super::*;
    use crate::PickedAsset;

    struct MockGate {
        granted: HashMap<Capability, bool>,
        calls: Mutex<Vec<(&'static str, Capability)>>,
    }

    impl MockGate {
        fn new(camera: bool, media_library: bool) -> Arc<Self> {
            Arc::new(Self {
                granted: HashMap::from([
                    (Capability::Camera, camera),
                    (Capability::MediaLibrary, media_library),
                ]),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(&'static str, Capability)> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, op: &'static str, capability: Capability) -> bool {
            self.calls.lock().unwrap().push((op, capability));
            self.granted.get(&capability).copied().unwrap_or(false)
        }
    }

    impl PermissionGate for MockGate {
        fn status(
            &self,
            capability: Capability,
        ) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            Box::pin(async move { self.answer("status", capability) })
        }

        fn request(
            &self,
            capability: Capability,
        ) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            Box::pin(async move { self.answer("request", capability) })
        }
    }

    struct MockPicker {
        outcome: PickerOutcome,
        launches: Mutex<Vec<(&'static str, PickerOptions)>>,
    }

    impl MockPicker {
        fn new(outcome: PickerOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                launches: Mutex::new(Vec::new()),
            })
        }

        fn launches(&self) -> Vec<(&'static str, PickerOptions)> {
            self.launches.lock().unwrap().clone()
        }

        fn launch(
            &self,
            source: &'static str,
            options: &PickerOptions,
        ) -> Result<PickerOutcome, MediaError> {
            self.launches.lock().unwrap().push((source, options.clone()));
            Ok(self.outcome.clone())
        }
    }

    impl MediaPicker for MockPicker {
        fn launch_library<'a>(
            &'a self,
            options: &'a PickerOptions,
        ) -> Pin<Box<dyn Future<Output = Result<PickerOutcome, MediaError>> + Send + 'a>> {
            Box::pin(async move { self.launch("library", options) })
        }

        fn launch_camera<'a>(
            &'a self,
            options: &'a PickerOptions,
        ) -> Pin<Box<dyn Future<Output = Result<PickerOutcome, MediaError>> + Send + 'a>> {
            Box::pin(async move { self.launch("camera", options) })
        }
    }

    /// Accepts every PUT with 201 and records URL and body.
    #[derive(Default)]
    struct RecordingTransport {
        puts: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RecordingTransport {
        fn urls(&self) -> Vec<String> {
            self.puts.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    impl BlobTransport for RecordingTransport {
        fn put(
            &self,
            request: PutRequest,
        ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>>
        {
            Box::pin(async move {
                let body = match request.body {
                    PutBody::Bytes(data) => data.to_vec(),
                    PutBody::Stream { mut stream, .. } => {
                        let mut body = Vec::new();
                        while let Some(chunk) = stream.next().await {
                            body.extend_from_slice(&chunk?);
                        }
                        body
                    }
                };
                self.puts.lock().unwrap().push((request.url, body));
                Ok(TransportResponse::with_status(201))
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        assets: Vec<PickedAsset>,
        transport: Arc<RecordingTransport>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut assets = Vec::new();
            for (name, kind) in [
                ("IMG_0001.HEIC", MediaKind::Image),
                ("clip.mov", MediaKind::Video),
            ] {
                let path = dir.path().join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                assets.push(PickedAsset {
                    uri: format!("file://{}", path.display()),
                    file_name: Some(name.to_string()),
                    kind: Some(kind),
                    ..PickedAsset::default()
                });
            }
            Self {
                _dir: dir,
                assets,
                transport: Arc::new(RecordingTransport::default()),
            }
        }

        fn media(
            &self,
            platform: Platform,
            gate: Arc<MockGate>,
            picker: Arc<MockPicker>,
        ) -> MediaUploader {
            let uploader = BlobUploader::with_collaborators(
                UploaderConfig::new("acct", "media", "sig=abc"),
                self.transport.clone(),
                Arc::new(LocalFileSource),
            )
            .unwrap();
            MediaUploader::with_uploader(uploader, platform, gate, picker)
        }
    }

    #[tokio::test]
    async fn web_never_consults_gate() {
        let fx = Fixture::new();
        let gate = MockGate::new(false, false);
        let picker = MockPicker::new(PickerOutcome::canceled());
        let media = fx.media(Platform::Web, gate.clone(), picker);

        assert!(media.request_camera_permission().await);
        assert!(media.request_media_library_permission().await);
        assert_eq!(
            media.check_permissions().await,
            PermissionSnapshot {
                camera: true,
                media_library: true
            }
        );
        assert!(media.take_photo(None).await.is_ok());
        assert!(gate.calls().is_empty());
    }

    #[tokio::test]
    async fn check_permissions_reads_status_without_prompting() {
        let fx = Fixture::new();
        let gate = MockGate::new(true, false);
        let media = fx.media(
            Platform::Android,
            gate.clone(),
            MockPicker::new(PickerOutcome::canceled()),
        );

        let snapshot = media.check_permissions().await;
        assert!(snapshot.camera);
        assert!(!snapshot.media_library);
        assert!(gate.calls().iter().all(|(op, _)| *op == "status"));
    }

    #[tokio::test]
    async fn denied_permission_blocks_picker() {
        let fx = Fixture::new();
        let picker = MockPicker::new(PickerOutcome::picked(fx.assets.clone()));
        let media = fx.media(Platform::Ios, MockGate::new(false, false), picker.clone());

        let err = media.pick_image_from_library(None).await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::PermissionDenied(Capability::MediaLibrary)
        ));
        assert_eq!(
            err.to_string(),
            "permission to access media library was denied"
        );

        assert!(matches!(
            media.take_photo(None).await,
            Err(MediaError::PermissionDenied(Capability::Camera))
        ));
        assert!(matches!(
            media.quick_upload_from_camera(None, None, None).await,
            Err(MediaError::PermissionDenied(Capability::Camera))
        ));
        assert!(picker.launches().is_empty());
        assert!(fx.transport.urls().is_empty());
    }

    #[tokio::test]
    async fn pick_operations_apply_presets() {
        let fx = Fixture::new();
        let picker = MockPicker::new(PickerOutcome::canceled());
        let media = fx.media(Platform::Ios, MockGate::new(true, true), picker.clone());

        media.pick_image_from_library(None).await.unwrap();
        media.pick_multiple_images(None).await.unwrap();
        media.take_photo(None).await.unwrap();
        media
            .pick_multiple_images(Some(PickerOptions::multiple_images().with_selection_limit(2)))
            .await
            .unwrap();

        let launches = picker.launches();
        assert_eq!(launches[0], ("library", PickerOptions::single_image()));
        assert_eq!(launches[1], ("library", PickerOptions::multiple_images()));
        assert_eq!(launches[2], ("camera", PickerOptions::camera()));
        assert_eq!(launches[3].1.selection_limit, Some(2));
    }

    #[tokio::test]
    async fn canceled_or_empty_outcome_uploads_nothing() {
        let fx = Fixture::new();
        let media = fx.media(
            Platform::Ios,
            MockGate::new(true, true),
            MockPicker::new(PickerOutcome::canceled()),
        );

        assert!(
            media
                .process_and_upload_one(&PickerOutcome::canceled(), "a.jpg", None)
                .await
                .is_none()
        );
        assert!(
            media
                .process_and_upload_many(&PickerOutcome::picked(Vec::new()), "image", &mut ())
                .await
                .is_none()
        );
        assert!(
            media
                .quick_upload_from_library(None, None, None)
                .await
                .unwrap()
                .is_none()
        );
        assert!(fx.transport.urls().is_empty());
    }

    #[tokio::test]
    async fn upload_one_uses_first_asset_and_reports_progress() {
        let fx = Fixture::new();
        let media = fx.media(
            Platform::Ios,
            MockGate::new(true, true),
            MockPicker::new(PickerOutcome::canceled()),
        );
        let outcome = PickerOutcome::picked(fx.assets.clone());

        let mut seen = Vec::new();
        let mut on_progress = |p: UploadProgress| seen.push(p);
        let result = media
            .process_and_upload_one(
                &outcome,
                "vacation.heic",
                Some(&mut on_progress as &mut dyn FnMut(UploadProgress)),
            )
            .await
            .unwrap();

        let blob = result.blob().unwrap();
        assert!(blob.remote_name.starts_with("img_"));
        assert!(blob.remote_name.ends_with(".heic"));
        assert_eq!(seen.last().map(|p| p.bytes_written), Some(13));

        let puts = fx.transport.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].1, b"IMG_0001.HEIC");
    }

    #[tokio::test]
    async fn upload_many_names_and_kinds() {
        let fx = Fixture::new();
        let media = fx.media(
            Platform::Android,
            MockGate::new(true, true),
            MockPicker::new(PickerOutcome::canceled()),
        );
        let outcome = PickerOutcome::picked(fx.assets.clone());

        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<BatchEvent>();
        let results = media
            .process_and_upload_many(&outcome, "trip", &mut tx)
            .await
            .unwrap();
        drop(tx);

        assert_eq!(results.len(), 2);
        let first = results[0].blob().unwrap();
        let second = results[1].blob().unwrap();
        assert!(first.remote_name.starts_with("img_"));
        assert!(first.remote_name.ends_with(".HEIC"));
        assert!(second.remote_name.starts_with("vid_"));
        assert!(second.remote_name.ends_with(".mov"));
        assert_eq!(second.content_type.as_deref(), Some("video/quicktime"));

        let mut completed = Vec::new();
        while let Some(event) = rx.recv().await {
            if let BatchEvent::FileComplete { index, .. } = event {
                completed.push(index);
            }
        }
        assert_eq!(completed, vec![0, 1]);
    }

    #[tokio::test]
    async fn quick_upload_from_camera_picks_then_uploads() {
        let fx = Fixture::new();
        let picker = MockPicker::new(PickerOutcome::picked(vec![fx.assets[0].clone()]));
        let gate = MockGate::new(true, false);
        let media = fx.media(Platform::Ios, gate.clone(), picker.clone());

        let result = media
            .quick_upload_from_camera(None, None, None)
            .await
            .unwrap()
            .unwrap();

        assert!(result.is_success());
        assert_eq!(gate.calls(), vec![("request", Capability::Camera)]);
        assert_eq!(picker.launches()[0].0, "camera");
        assert!(result.blob().unwrap().remote_name.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn token_update_flows_to_uploads() {
        let fx = Fixture::new();
        let mut media = fx.media(
            Platform::Web,
            MockGate::new(true, true),
            MockPicker::new(PickerOutcome::canceled()),
        );

        assert!(matches!(
            media.update_access_token(""),
            Err(MediaError::Upload(_))
        ));
        media.update_access_token("sig=rotated").unwrap();

        let outcome = PickerOutcome::picked(vec![fx.assets[0].clone()]);
        media.process_and_upload_one(&outcome, "a.jpg", None).await;
        assert!(fx.transport.urls()[0].ends_with("?sig=rotated"));
        assert_eq!(
            media.uploader().describe_config().base_url,
            "https://acct.blob.core.windows.net/media"
        );
    }

    #[test]
    fn new_rejects_incomplete_config() {
        let err = MediaUploader::new(
            UploaderConfig::new("acct", "", "sig"),
            Platform::Ios,
            MockGate::new(true, true),
            MockPicker::new(PickerOutcome::canceled()),
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "container name is required");
    }
}
