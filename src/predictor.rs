use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::errors::PredictionError;
use crate::features::FeatureRow;
use crate::models::PropertyFeatures;
use crate::pipeline::Pipeline;

/// Materializes validated listings into named feature rows and scores them.
///
/// The pipeline handle is loaded once at startup and shared read-only. Inference
/// runs on the blocking thread pool; the semaphore bounds how many calls run at
/// once, and a concurrency of 1 serializes them.
#[derive(Clone)]
pub struct Predictor {
    pipeline: Arc<dyn Pipeline>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl Predictor {
    /// Creates a predictor allowing `concurrency` simultaneous inference calls (at least 1).
    pub fn new(pipeline: Arc<dyn Pipeline>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scores one listing.
    ///
    /// The row handed to the pipeline keeps its column names; the first (and only)
    /// value of the result is the price. Failures are never retried nor replaced by
    /// a default value.
    ///
    /// The permit travels with the blocking task, so a caller that goes away
    /// mid-inference does not free its slot before the pipeline call returns.
    pub async fn predict(&self, features: &PropertyFeatures) -> Result<f64, PredictionError> {
        let row = FeatureRow::from(features);

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let err = PredictionError::Runtime(e.to_string());
                log_failure(&row, &err);
                return Err(err);
            }
        };

        let pipeline = Arc::clone(&self.pipeline);
        let task_row = row.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.predict(std::slice::from_ref(&task_row))
        })
        .await;

        let result = match joined {
            Ok(output) => output
                .map_err(PredictionError::Pipeline)
                .and_then(Self::unwrap_single),
            Err(e) => Err(PredictionError::Runtime(e.to_string())),
        };
        if let Err(err) = &result {
            log_failure(&row, err);
        }
        result
    }

    /// Synchronous variant for tools that run outside the async runtime.
    pub fn predict_blocking(&self, features: &PropertyFeatures) -> Result<f64, PredictionError> {
        let row = FeatureRow::from(features);
        let result = self
            .pipeline
            .predict(std::slice::from_ref(&row))
            .map_err(PredictionError::Pipeline)
            .and_then(Self::unwrap_single);
        if let Err(err) = &result {
            log_failure(&row, err);
        }
        result
    }

    fn unwrap_single(values: Vec<f64>) -> Result<f64, PredictionError> {
        let price = values
            .first()
            .copied()
            .ok_or(PredictionError::EmptyOutput)?;
        if !price.is_finite() {
            return Err(PredictionError::NonFinite(price));
        }
        Ok(price)
    }
}

fn log_failure(row: &FeatureRow, err: &PredictionError) {
    tracing::error!("Prediction failed for feature row {}: {}", row.to_json(), err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COLUMNS;
    use crate::models::*;
    use crate::pipeline::PipelineError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn sample() -> PropertyFeatures {
        PropertyFeatures {
            total_area_sqm: 120.0,
            cadastral_income: 900.0,
            primary_energy_consumption_sqm: 210.0,
            nbr_bedrooms: 3,
            nbr_frontages: 3,
            subproperty_type: SubpropertyType::House,
            province: Province::Namur,
            fl_terrace: false,
            fl_garden: true,
            fl_swimming_pool: false,
            fl_furnished: false,
            epc: Epc::Poor,
            equipped_kitchen: EquippedKitchen::SemiEquipped,
            heating_type: HeatingType::Oil,
        }
    }

    /// Records the column names it receives and returns area * 2000.
    struct RecordingPipeline {
        names: Vec<String>,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingPipeline {
        fn new() -> Self {
            Self {
                names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Pipeline for RecordingPipeline {
        fn feature_names_in(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PipelineError> {
            let mut seen = self.seen.lock().unwrap();
            let mut out = Vec::new();
            for row in rows {
                seen.push(row.column_names().map(str::to_string).collect());
                out.push(row.get("total_area_sqm").and_then(|v| v.as_f64()).unwrap_or(0.0) * 2000.0);
            }
            Ok(out)
        }
    }

    struct FixedPipeline(Result<Vec<f64>, PipelineError>);

    impl Pipeline for FixedPipeline {
        fn feature_names_in(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _rows: &[FeatureRow]) -> Result<Vec<f64>, PipelineError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_pipeline_receives_named_row() {
        let pipeline = Arc::new(RecordingPipeline::new());
        let predictor = Predictor::new(pipeline.clone(), 2);

        let price = predictor.predict(&sample()).await.unwrap();
        assert_eq!(price, 240_000.0);

        let seen = pipeline.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], FEATURE_COLUMNS.to_vec());
    }

    /// In-memory log sink for a scoped fmt subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
            let sink = self.clone();
            tracing_subscriber::fmt()
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .with_env_filter(tracing_subscriber::EnvFilter::new("immo_predict=debug"))
                .finish()
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        fn error_lines(&self) -> usize {
            self.contents().lines().filter(|l| l.contains("ERROR")).count()
        }
    }

    fn rejected_column() -> PipelineError {
        PipelineError::TypeMismatch {
            column: "province".to_string(),
            expected: "a category string",
            found: "int",
        }
    }

    #[tokio::test]
    async fn test_pipeline_error_is_surfaced() {
        let err = rejected_column();
        let predictor = Predictor::new(Arc::new(FixedPipeline(Err(err.clone()))), 1);
        assert_eq!(
            predictor.predict(&sample()).await,
            Err(PredictionError::Pipeline(err))
        );
    }

    #[tokio::test]
    async fn test_async_failure_is_logged_once_with_row() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let predictor = Predictor::new(Arc::new(FixedPipeline(Err(rejected_column()))), 1);
        assert!(predictor.predict(&sample()).await.is_err());

        let out = logs.contents();
        assert_eq!(logs.error_lines(), 1, "{}", out);
        assert!(out.contains("total_area_sqm"));
        assert!(out.contains("Namur"));
        assert!(out.contains("column 'province' expected a category string"));
    }

    #[tokio::test]
    async fn test_output_failures_are_logged_with_row() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let empty = Predictor::new(Arc::new(FixedPipeline(Ok(vec![]))), 1);
        assert!(empty.predict(&sample()).await.is_err());

        let out = logs.contents();
        assert_eq!(logs.error_lines(), 1, "{}", out);
        assert!(out.contains("Pipeline returned no prediction"));
        assert!(out.contains("primary_energy_consumption_sqm"));
    }

    #[test]
    fn test_blocking_failure_is_logged_with_row() {
        let logs = CapturedLogs::default();
        let predictor = Predictor::new(Arc::new(FixedPipeline(Ok(vec![f64::INFINITY]))), 1);

        let result = tracing::subscriber::with_default(logs.subscriber(), || {
            predictor.predict_blocking(&sample())
        });
        assert!(matches!(result, Err(PredictionError::NonFinite(_))));

        let out = logs.contents();
        assert_eq!(logs.error_lines(), 1, "{}", out);
        assert!(out.contains("total_area_sqm"));
        assert!(out.contains("non-finite"));
    }

    #[tokio::test]
    async fn test_empty_and_non_finite_outputs_fail() {
        let empty = Predictor::new(Arc::new(FixedPipeline(Ok(vec![]))), 1);
        assert_eq!(
            empty.predict(&sample()).await,
            Err(PredictionError::EmptyOutput)
        );

        let nan = Predictor::new(Arc::new(FixedPipeline(Ok(vec![f64::NAN]))), 1);
        assert!(matches!(
            nan.predict(&sample()).await,
            Err(PredictionError::NonFinite(_))
        ));
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let predictor = Predictor::new(Arc::new(FixedPipeline(Ok(vec![1.0]))), 0);
        assert_eq!(predictor.concurrency(), 1);
        assert_eq!(predictor.predict_blocking(&sample()), Ok(1.0));
    }

    /// Tracks the peak number of concurrent predict calls.
    struct SlowPipeline {
        delay_ms: u64,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowPipeline {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl Pipeline for SlowPipeline {
        fn feature_names_in(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _rows: &[FeatureRow]) -> Result<Vec<f64>, PipelineError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![1.0])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_permit_serializes_inference() {
        let pipeline = Arc::new(SlowPipeline::new(20));
        let predictor = Predictor::new(pipeline.clone(), 1);

        let mut handles = vec![];
        for _ in 0..6 {
            let predictor = predictor.clone();
            handles.push(tokio::spawn(async move {
                predictor.predict(&sample()).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(1.0));
        }

        assert_eq!(pipeline.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_caller_keeps_slot_until_inference_ends() {
        let pipeline = Arc::new(SlowPipeline::new(300));
        let predictor = Predictor::new(pipeline.clone(), 1);

        let first = {
            let predictor = predictor.clone();
            tokio::spawn(async move { predictor.predict(&sample()).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        assert_eq!(predictor.predict(&sample()).await, Ok(1.0));
        assert_eq!(pipeline.peak.load(Ordering::SeqCst), 1);
    }
}
