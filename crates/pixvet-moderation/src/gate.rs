//! The moderation gate.
//!
//! Wraps a [`ModerationProvider`] with the staging/cleanup lifecycle and
//! the verdict calibration. The gate never propagates provider failures:
//! any error becomes a failing verdict with the detail tucked into
//! `verdict.error` for logging, so callers treat a broken scan exactly
//! like rejected content.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use pixvet_core::asset::ModerationVerdict;
use pixvet_core::format::FormatTag;
use uuid::Uuid;

use crate::labels::is_disallowed;
use crate::provider::{ModerationLabel, ModerationProvider};

pub struct ModerationGate {
    provider: Arc<dyn ModerationProvider>,
    /// Recall filter passed to the provider; labels below this are never
    /// returned.
    min_confidence: f32,
    /// A disallowed label at or above this confidence rejects the upload.
    rejection_threshold: f32,
}

/// Transient scan objects live under their own prefix, keyed by a fresh
/// UUID plus a timestamp, with an extension matching the staged encoding.
fn transient_key(format: FormatTag) -> String {
    format!(
        "moderation/{}-{}.{}",
        Uuid::new_v4(),
        Utc::now().timestamp_millis(),
        format.extension()
    )
}

impl ModerationGate {
    pub fn new(
        provider: Arc<dyn ModerationProvider>,
        min_confidence: f32,
        rejection_threshold: f32,
    ) -> Self {
        Self {
            provider,
            min_confidence,
            rejection_threshold,
        }
    }

    /// Scan a buffer. Never returns an error: every failure path collapses
    /// into a `passed=false` verdict.
    pub async fn scan(&self, data: &Bytes, format: FormatTag) -> ModerationVerdict {
        let key = transient_key(format);

        if let Err(e) = self
            .provider
            .stage(&key, data.clone(), format.mime_type())
            .await
        {
            tracing::error!(error = %e, key = %key, "Moderation staging failed, failing closed");
            return ModerationVerdict::scan_failed(e.to_string());
        }

        let detection = self.provider.detect_labels(&key, self.min_confidence).await;

        // The transient object is removed on every path from here on,
        // including detection failure. A cleanup failure is logged and must
        // not mask the verdict.
        if let Err(e) = self.provider.unstage(&key).await {
            tracing::warn!(error = %e, key = %key, "Failed to delete transient scan object");
        }

        match detection {
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Moderation detection failed, failing closed");
                ModerationVerdict::scan_failed(e.to_string())
            }
            Ok(found) => self.evaluate(found),
        }
    }

    fn evaluate(&self, found: Vec<ModerationLabel>) -> ModerationVerdict {
        let names: Vec<String> = found.iter().map(|l| l.name.clone()).collect();

        let mut max_confidence: f32 = 0.0;
        let mut has_disallowed = false;
        for label in &found {
            if is_disallowed(label) {
                max_confidence = max_confidence.max(label.confidence);
                if label.confidence >= self.rejection_threshold {
                    has_disallowed = true;
                }
            }
        }

        if has_disallowed {
            tracing::warn!(
                labels = ?names,
                max_confidence,
                "Moderation scan rejected content"
            );
            ModerationVerdict::rejected(names, max_confidence)
        } else {
            tracing::info!(
                label_count = names.len(),
                max_confidence,
                "Moderation scan passed"
            );
            ModerationVerdict::passed(names, max_confidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum DetectBehavior {
        Labels(Vec<ModerationLabel>),
        Fail,
    }

    struct FakeProvider {
        detect: DetectBehavior,
        fail_stage: bool,
        fail_unstage: bool,
        stage_calls: AtomicUsize,
        detect_calls: AtomicUsize,
        unstage_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(labels: Vec<ModerationLabel>) -> Self {
            Self {
                detect: DetectBehavior::Labels(labels),
                fail_stage: false,
                fail_unstage: false,
                stage_calls: AtomicUsize::new(0),
                detect_calls: AtomicUsize::new(0),
                unstage_calls: AtomicUsize::new(0),
            }
        }

        fn failing_detect() -> Self {
            Self {
                detect: DetectBehavior::Fail,
                ..Self::returning(Vec::new())
            }
        }
    }

    #[async_trait]
    impl ModerationProvider for FakeProvider {
        async fn stage(
            &self,
            _key: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> Result<(), ProviderError> {
            self.stage_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_stage {
                return Err(ProviderError::Staging("staging bucket unavailable".into()));
            }
            Ok(())
        }

        async fn detect_labels(
            &self,
            _key: &str,
            _min_confidence: f32,
        ) -> Result<Vec<ModerationLabel>, ProviderError> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            match &self.detect {
                DetectBehavior::Labels(labels) => Ok(labels.clone()),
                DetectBehavior::Fail => {
                    Err(ProviderError::Detection("provider timeout".into()))
                }
            }
        }

        async fn unstage(&self, _key: &str) -> Result<(), ProviderError> {
            self.unstage_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_unstage {
                return Err(ProviderError::Cleanup("delete denied".into()));
            }
            Ok(())
        }
    }

    fn label(name: &str, confidence: f32) -> ModerationLabel {
        ModerationLabel {
            name: name.to_string(),
            parent_name: None,
            confidence,
        }
    }

    fn gate(provider: Arc<FakeProvider>) -> ModerationGate {
        ModerationGate::new(provider, 50.0, 70.0)
    }

    #[tokio::test]
    async fn test_clean_scan_passes_and_cleans_up_once() {
        let provider = Arc::new(FakeProvider::returning(Vec::new()));
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(verdict.passed);
        assert!(verdict.labels.is_empty());
        assert_eq!(verdict.max_confidence, 0.0);
        assert_eq!(provider.unstage_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disallowed_label_at_threshold_rejects() {
        let provider = Arc::new(FakeProvider::returning(vec![label(
            "Explicit Nudity",
            70.0,
        )]));
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(!verdict.passed);
        assert!(verdict.error.is_none());
        assert_eq!(verdict.labels, vec!["Explicit Nudity".to_string()]);
        assert_eq!(verdict.max_confidence, 70.0);
        assert_eq!(provider.unstage_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disallowed_label_below_threshold_passes() {
        let provider = Arc::new(FakeProvider::returning(vec![label("Alcohol", 69.9)]));
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Jpeg)
            .await;

        assert!(verdict.passed);
        assert_eq!(verdict.labels, vec!["Alcohol".to_string()]);
        assert_eq!(verdict.max_confidence, 69.9);
    }

    #[tokio::test]
    async fn test_weapons_at_high_confidence_pass() {
        let provider = Arc::new(FakeProvider::returning(vec![label("Weapons", 99.0)]));
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(verdict.passed);
        // Not a disallowed candidate, so it contributes no confidence.
        assert_eq!(verdict.max_confidence, 0.0);
        assert_eq!(verdict.labels, vec!["Weapons".to_string()]);
    }

    #[tokio::test]
    async fn test_detection_failure_fails_closed_and_cleans_up_once() {
        let provider = Arc::new(FakeProvider::failing_detect());
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(!verdict.passed);
        assert!(verdict.error.is_some());
        assert_eq!(provider.detect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.unstage_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_staging_failure_fails_closed_without_detection() {
        let provider = Arc::new(FakeProvider {
            fail_stage: true,
            ..FakeProvider::returning(Vec::new())
        });
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(!verdict.passed);
        assert!(verdict.error.is_some());
        assert_eq!(provider.detect_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.unstage_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleanup_failure_never_flips_the_verdict() {
        let provider = Arc::new(FakeProvider {
            fail_unstage: true,
            ..FakeProvider::returning(vec![label("Weapons", 40.0)])
        });
        let verdict = gate(provider.clone())
            .scan(&Bytes::from_static(b"img"), FormatTag::Png)
            .await;

        assert!(verdict.passed);
        assert_eq!(provider.unstage_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_keys_are_unique_and_carry_extension() {
        let a = transient_key(FormatTag::Png);
        let b = transient_key(FormatTag::Png);
        assert_ne!(a, b);
        assert!(a.starts_with("moderation/"));
        assert!(a.ends_with(".png"));
        assert!(transient_key(FormatTag::WebP).ends_with(".webp"));
        assert!(transient_key(FormatTag::Jpeg).ends_with(".jpg"));
    }
}
