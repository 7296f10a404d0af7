//! Pipeline orchestrator.
//!
//! Sequences the stages over one batch of documents:
//!
//! ```text
//! Idle → Ingesting → Parsing → [Cleaning] → Extracting → Rating → Judging → Combining → Done
//!                                                                          ↘ Failed(stage)
//! ```
//!
//! A stage starts only once its predecessor has a result for every candidate. Every
//! stage runs through the same `StageRunner`, so the concurrency bound and the run
//! deadline apply uniformly. Per-candidate failures flow forward as `StageResult`
//! values; only run-level problems return a `PipelineError`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::combiner::{combine, StageOutputs};
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::ingest::{load_documents, DocumentParser, PdfTextParser};
use crate::judge::{ConsistencyJudge, JudgeCandidate, JudgingService, LlmJudge};
use crate::llm_client::InferenceClient;
use crate::models::{CandidateRecord, ParsedDocument, RawDocument};
use crate::services::{
    CleaningService, ExtractionService, LlmCleaner, LlmExtractor, LlmRater, RatingService,
};
use crate::stage::{ProgressKind, ProgressReporter, Stage, StageFailure, StageResult, StageRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// The services a run depends on. Each one is swappable.
#[derive(Clone)]
pub struct Services {
    pub parser: Arc<dyn DocumentParser>,
    pub cleaner: Arc<dyn CleaningService>,
    pub extractor: Arc<dyn ExtractionService>,
    pub rater: Arc<dyn RatingService>,
    pub judge: Arc<dyn JudgingService>,
}

impl Services {
    /// Production wiring: PDF/TXT parsing plus LLM services sharing one client, so they
    /// also share its request ceiling.
    pub fn llm(client: InferenceClient) -> Self {
        Self {
            parser: Arc::new(PdfTextParser),
            cleaner: Arc::new(LlmCleaner::new(client.clone())),
            extractor: Arc::new(LlmExtractor::new(client.clone())),
            rater: Arc::new(LlmRater::new(client.clone())),
            judge: Arc::new(LlmJudge::new(client)),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Every ingested candidate exactly once, ranked best first.
    pub records: Vec<CandidateRecord>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// False when cleaning was disabled or the job description could not be cleaned.
    pub job_description_cleaned: bool,
}

impl RunReport {
    pub fn rated(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.final_rating().score().is_some())
            .count()
    }

    pub fn fallbacks(&self) -> usize {
        self.records.iter().filter(|r| r.used_fallback()).count()
    }
}

pub struct Pipeline {
    services: Services,
    config: PipelineConfig,
    progress: ProgressReporter,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(services: Services, config: PipelineConfig, progress: ProgressReporter) -> Self {
        Self {
            services,
            config,
            progress,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Ingests a file or directory, then runs every stage over it.
    pub async fn run_path(
        &mut self,
        path: &Path,
        job_description: &str,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        self.check_config()?;
        self.enter(Stage::Ingesting, 0);
        let documents = match load_documents(path).await {
            Ok(documents) => documents,
            Err(e) => return Err(self.fail(Stage::Ingesting, e)),
        };
        self.process(documents, job_description, started).await
    }

    /// Runs every stage over already-loaded documents.
    pub async fn run(
        &mut self,
        documents: Vec<RawDocument>,
        job_description: &str,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        self.check_config()?;
        self.enter(Stage::Ingesting, documents.len());
        self.process(documents, job_description, started).await
    }

    async fn process(
        &mut self,
        documents: Vec<RawDocument>,
        job_description: &str,
        started: Instant,
    ) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        if documents.is_empty() {
            return Err(self.fail(Stage::Ingesting, PipelineError::NoDocuments));
        }
        let total = documents.len();
        self.progress
            .emit(ProgressKind::StageFinished, Stage::Ingesting, total, total);

        let deadline = self.config.run_deadline.map(|budget| started + budget);
        let runner = StageRunner::new(self.config.concurrency, deadline, self.progress.clone());
        let services = self.services.clone();
        info!(
            "Screening {total} candidate(s) with {} worker(s), judge batches of {}",
            runner.concurrency(),
            self.config.judge_batch_size
        );

        // Successful units across every stage so far.
        let mut completed = 0;

        // Parsing
        self.enter(Stage::Parsing, total);
        let parser = &services.parser;
        let parsed = runner
            .run(Stage::Parsing, &documents, move |doc| async move {
                parser.parse(doc).await
            })
            .await;
        self.finish_stage(Stage::Parsing, &parsed, &mut completed)?;

        // Cleaning (optional)
        let mut job_description_cleaned = false;
        let mut job_description = job_description.to_string();
        let mut cleaned = Vec::new();
        let text_stage = if self.config.enable_cleaning {
            self.enter(Stage::Cleaning, total);
            if runner.deadline_passed() {
                warn!("Run deadline passed, using the job description as given");
            } else {
                match services.cleaner.clean(&job_description).await {
                    Ok(clean_jd) => {
                        job_description = clean_jd;
                        job_description_cleaned = true;
                    }
                    Err(e) => warn!("Job description cleaning failed, using it as given: {e}"),
                }
            }
            let cleaner = &services.cleaner;
            cleaned = runner
                .run(Stage::Cleaning, &parsed, move |result| async move {
                    let doc = result.as_input(Stage::Parsing)?;
                    Ok::<_, StageFailure>(clean_or_keep(cleaner.as_ref(), doc).await)
                })
                .await;
            self.finish_stage(Stage::Cleaning, &cleaned, &mut completed)?;
            Stage::Cleaning
        } else {
            Stage::Parsing
        };
        let texts = if self.config.enable_cleaning {
            &cleaned
        } else {
            &parsed
        };

        // Extracting
        self.enter(Stage::Extracting, total);
        let extractor = &services.extractor;
        let profiles = runner
            .run(Stage::Extracting, texts, move |result| async move {
                let doc = result.as_input(text_stage)?;
                Ok::<_, StageFailure>(extractor.extract(&doc.text).await?)
            })
            .await;
        self.finish_stage(Stage::Extracting, &profiles, &mut completed)?;

        // Rating
        self.enter(Stage::Rating, total);
        let rater = &services.rater;
        let jd = job_description.as_str();
        let ratings = runner
            .run(Stage::Rating, &profiles, move |result| async move {
                let profile = result.as_input(Stage::Extracting)?;
                Ok::<_, StageFailure>(rater.rate(profile, jd).await?)
            })
            .await;
        self.finish_stage(Stage::Rating, &ratings, &mut completed)?;

        // Judging
        let candidates: Vec<JudgeCandidate> = profiles
            .iter()
            .zip(&ratings)
            .filter_map(|(profile, rating)| {
                Some(JudgeCandidate {
                    id: rating.id(),
                    profile: profile.value()?.clone(),
                    rating: rating.value()?.clone(),
                })
            })
            .collect();
        self.enter(Stage::Judging, candidates.len());
        let judge = ConsistencyJudge::new(services.judge.clone(), self.config.judge_batch_size);
        let judged = judge.judge(&runner, &candidates, jd).await;

        // Combining
        self.enter(Stage::Combining, total);
        let records = combine(
            &documents,
            StageOutputs {
                parsed,
                cleaned,
                profiles,
                ratings,
                judged,
            },
        );
        self.progress
            .emit(ProgressKind::StageFinished, Stage::Combining, total, total);

        self.state = PipelineState::Done;
        self.progress
            .emit(ProgressKind::RunCompleted, Stage::Combining, total, total);

        let report = RunReport {
            records,
            started_at,
            elapsed: started.elapsed(),
            job_description_cleaned,
        };
        info!(
            "Run finished in {:.1}s: {}/{} rated, {} judging fallback(s)",
            report.elapsed.as_secs_f64(),
            report.rated(),
            total,
            report.fallbacks()
        );
        Ok(report)
    }

    fn check_config(&mut self) -> Result<(), PipelineError> {
        match self.config.validate() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(Stage::Ingesting, e.into())),
        }
    }

    fn enter(&mut self, stage: Stage, total: usize) {
        self.state = PipelineState::Running(stage);
        info!("Entering {stage} ({total} item(s))");
        self.progress
            .emit(ProgressKind::StageStarted, stage, 0, total);
    }

    fn fail(&mut self, stage: Stage, error: PipelineError) -> PipelineError {
        self.state = PipelineState::Failed(stage);
        warn!("Run failed during {stage}: {error}");
        self.progress.emit(ProgressKind::RunFailed, stage, 0, 0);
        error
    }

    /// Logs the stage outcome and adds its successes to `completed`. Fails the run only
    /// when the deadline expired before any unit of any stage completed.
    fn finish_stage<T>(
        &mut self,
        stage: Stage,
        results: &[StageResult<T>],
        completed: &mut usize,
    ) -> Result<(), PipelineError> {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!("[{stage}] {succeeded}/{} succeeded", results.len());
        *completed += succeeded;

        let none_dispatched = !results.is_empty()
            && results
                .iter()
                .all(|r| matches!(r.failure_reason(), Some(StageFailure::Timeout)));
        if none_dispatched && *completed == 0 {
            return Err(self.fail(stage, PipelineError::DeadlineExceeded { stage }));
        }
        Ok(())
    }
}

/// A failed cleaning call is not a candidate failure: the uncleaned text goes on.
async fn clean_or_keep(cleaner: &dyn CleaningService, doc: &ParsedDocument) -> ParsedDocument {
    match cleaner.clean(&doc.text).await {
        Ok(text) => ParsedDocument {
            text,
            ..doc.clone()
        },
        Err(e) => {
            warn!("Cleaning {} failed, keeping original text: {e}", doc.file_name);
            doc.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::JudgedEntry;
    use crate::llm_client::InferenceError;
    use crate::models::{FinalRating, Rating, StructuredProfile};
    use crate::stage::ProgressEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedReceiver;

    // ── fakes ────────────────────────────────────────────────────────────────

    /// Upper-cases the text. Fails every call when `fail` is set.
    struct FakeCleaner {
        fail: bool,
    }

    #[async_trait]
    impl CleaningService for FakeCleaner {
        async fn clean(&self, text: &str) -> Result<String, InferenceError> {
            if self.fail {
                return Err(InferenceError::Transport("cleaner down".into()));
            }
            Ok(text.to_uppercase())
        }
    }

    /// First line becomes the name, the rest the summary.
    struct FakeExtractor {
        delay: Duration,
    }

    #[async_trait]
    impl ExtractionService for FakeExtractor {
        async fn extract(&self, text: &str) -> Result<StructuredProfile, InferenceError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if text.contains("EXTRACT_FAIL") {
                return Err(InferenceError::MalformedResponse("no json".into()));
            }
            let mut lines = text.lines();
            Ok(StructuredProfile {
                name: lines.next().map(str::to_string),
                summary: lines.next().map(str::to_string),
                ..Default::default()
            })
        }
    }

    /// Plain-text parsing after a fixed delay.
    struct SlowParser(Duration);

    #[async_trait]
    impl DocumentParser for SlowParser {
        async fn parse(&self, doc: &RawDocument) -> Result<ParsedDocument, StageFailure> {
            tokio::time::sleep(self.0).await;
            PdfTextParser.parse(doc).await
        }
    }

    /// Score is the profile summary parsed as a number.
    struct FakeRater {
        delay: Duration,
        seen_job_descriptions: Mutex<Vec<String>>,
    }

    impl FakeRater {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                seen_job_descriptions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RatingService for FakeRater {
        async fn rate(
            &self,
            profile: &StructuredProfile,
            job_description: &str,
        ) -> Result<Rating, InferenceError> {
            self.seen_job_descriptions
                .lock()
                .unwrap()
                .push(job_description.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let score = profile
                .summary
                .as_deref()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or(InferenceError::RateLimited)?;
            Ok(Rating {
                score,
                strengths: vec![],
                weaknesses: vec![],
                rationale: "fake".into(),
            })
        }
    }

    /// Adds half a point to every candidate.
    struct FakeJudge;

    #[async_trait]
    impl JudgingService for FakeJudge {
        async fn judge_batch(
            &self,
            batch: &[JudgeCandidate],
            _job_description: &str,
        ) -> Result<Vec<JudgedEntry>, InferenceError> {
            Ok(batch
                .iter()
                .map(|c| JudgedEntry::scored(c.id, c.rating.score + 0.5))
                .collect())
        }
    }

    fn services(cleaner_fails: bool, rater: Arc<FakeRater>) -> Services {
        Services {
            parser: Arc::new(PdfTextParser),
            cleaner: Arc::new(FakeCleaner { fail: cleaner_fails }),
            extractor: Arc::new(FakeExtractor {
                delay: Duration::ZERO,
            }),
            rater,
            judge: Arc::new(FakeJudge),
        }
    }

    fn config(enable_cleaning: bool) -> PipelineConfig {
        PipelineConfig {
            concurrency: 3,
            judge_batch_size: 2,
            per_call_timeout: Duration::from_secs(5),
            max_retries: 0,
            run_deadline: None,
            max_concurrent_requests: 4,
            enable_cleaning,
        }
    }

    fn txt(name: &str, body: &str) -> RawDocument {
        RawDocument::new(format!("{name}.txt"), body.as_bytes().to_vec())
    }

    fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn started_stages(events: &[ProgressEvent]) -> Vec<Stage> {
        events
            .iter()
            .filter(|e| e.kind == ProgressKind::StageStarted)
            .map(|e| e.stage)
            .collect()
    }

    // ── tests ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_every_candidate_survives_mixed_failures() {
        let documents = vec![
            txt("alice", "Alice\n6"),
            RawDocument::new("broken.txt", vec![0xff, 0xfe]),
            txt("bob", "Bob\n9"),
            txt("carol", "Carol\nEXTRACT_FAIL"),
            txt("dave", "Dave\nunscorable"),
            txt("erin", "Erin\n6"),
        ];
        let ids: Vec<_> = documents.iter().map(|d| d.id).collect();
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            config(false),
            ProgressReporter::disabled(),
        );

        let report = pipeline.run(documents, "Rust engineer").await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(report.records.len(), 6);
        assert_eq!(report.rated(), 3);

        let order: Vec<_> = report.records.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[5], ids[1], ids[3], ids[4]]);

        let bob = &report.records[0];
        assert_eq!(bob.final_rating().score(), Some(9.5));
        assert_eq!(bob.initial_rating.as_ref().unwrap().score, 9.0);
        assert!(matches!(bob.final_rating(), FinalRating::Judged(_)));

        let broken = &report.records[3];
        assert!(broken.failed_at(Stage::Parsing));
        assert_eq!(broken.failures.len(), 1);
        assert!(report.records[4].failed_at(Stage::Extracting));
        assert!(report.records[5].failed_at(Stage::Rating));
        assert!(report.records[5].profile.is_some());
    }

    #[tokio::test]
    async fn test_progress_follows_the_state_machine() {
        let (reporter, mut rx) = ProgressReporter::channel();
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            config(true),
            reporter,
        );

        pipeline
            .run(vec![txt("alice", "Alice\n5"), txt("bob", "Bob\n7")], "jd")
            .await
            .unwrap();
        let events = drain(&mut rx);

        assert_eq!(
            started_stages(&events),
            vec![
                Stage::Ingesting,
                Stage::Parsing,
                Stage::Cleaning,
                Stage::Extracting,
                Stage::Rating,
                Stage::Judging,
                Stage::Combining
            ]
        );
        let parsing_done: Vec<usize> = events
            .iter()
            .filter(|e| e.stage == Stage::Parsing && e.kind == ProgressKind::ItemCompleted)
            .map(|e| e.completed)
            .collect();
        assert_eq!(parsing_done, vec![1, 2]);
        assert_eq!(events.last().unwrap().kind, ProgressKind::RunCompleted);
    }

    #[tokio::test]
    async fn test_cleaning_is_skipped_when_disabled() {
        let (reporter, mut rx) = ProgressReporter::channel();
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            config(false),
            reporter,
        );

        let report = pipeline.run(vec![txt("alice", "Alice\n5")], "jd").await.unwrap();

        assert!(!started_stages(&drain(&mut rx)).contains(&Stage::Cleaning));
        assert!(!report.job_description_cleaned);
        let profile = report.records[0].profile.as_ref().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_cleaned_text_and_job_description_flow_downstream() {
        let rater = Arc::new(FakeRater::new(Duration::ZERO));
        let mut pipeline = Pipeline::new(
            services(false, rater.clone()),
            config(true),
            ProgressReporter::disabled(),
        );

        let report = pipeline
            .run(vec![txt("alice", "Alice\n5")], "rust engineer")
            .await
            .unwrap();

        assert!(report.job_description_cleaned);
        let profile = report.records[0].profile.as_ref().unwrap();
        assert_eq!(profile.name.as_deref(), Some("ALICE"));
        assert_eq!(
            rater.seen_job_descriptions.lock().unwrap().clone(),
            vec!["RUST ENGINEER".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cleaning_failures_keep_original_text() {
        let rater = Arc::new(FakeRater::new(Duration::ZERO));
        let mut pipeline = Pipeline::new(
            services(true, rater.clone()),
            config(true),
            ProgressReporter::disabled(),
        );

        let report = pipeline
            .run(vec![txt("alice", "Alice\n5")], "rust engineer")
            .await
            .unwrap();

        assert!(!report.job_description_cleaned);
        let record = &report.records[0];
        assert_eq!(record.profile.as_ref().unwrap().name.as_deref(), Some("Alice"));
        assert!(record.failures.is_empty());
        assert_eq!(record.final_rating().score(), Some(5.5));
        assert_eq!(
            rater.seen_job_descriptions.lock().unwrap().clone(),
            vec!["rust engineer".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_documents_fails_in_ingesting() {
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            config(false),
            ProgressReporter::disabled(),
        );

        let err = pipeline.run(vec![], "jd").await.unwrap_err();

        assert!(matches!(err, PipelineError::NoDocuments));
        assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Ingesting));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_any_work() {
        let mut bad = config(false);
        bad.judge_batch_size = 0;
        let (reporter, mut rx) = ProgressReporter::channel();
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            bad,
            reporter,
        );

        let err = pipeline.run(vec![txt("alice", "Alice\n5")], "jd").await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        assert!(matches!(pipeline.state(), PipelineState::Failed(_)));
        assert_eq!(drain(&mut rx).last().unwrap().kind, ProgressKind::RunFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_mid_rating_keeps_every_candidate() {
        let documents: Vec<RawDocument> = (0..6)
            .map(|i| txt(&format!("cv{i}"), &format!("Candidate {i}\n{i}")))
            .collect();
        let mut cfg = config(false);
        cfg.concurrency = 1;
        cfg.run_deadline = Some(Duration::from_millis(250));
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::from_millis(100)))),
            cfg,
            ProgressReporter::disabled(),
        );

        let report = pipeline.run(documents, "jd").await.unwrap();

        assert_eq!(report.records.len(), 6);
        assert_eq!(report.rated(), 3);
        // Judging starts after the deadline, so every judged rating is a fallback.
        assert_eq!(report.fallbacks(), 3);
        let timed_out = report
            .records
            .iter()
            .filter(|r| {
                r.failures
                    .iter()
                    .any(|f| f.stage == Stage::Rating && f.failure == StageFailure::Timeout)
            })
            .count();
        assert_eq!(timed_out, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_mid_extracting_still_reports_every_candidate() {
        let documents: Vec<RawDocument> = (0..6)
            .map(|i| txt(&format!("cv{i}"), &format!("Candidate {i}\n{i}")))
            .collect();
        let mut cfg = config(false);
        cfg.concurrency = 1;
        cfg.run_deadline = Some(Duration::from_millis(250));
        let mut pipeline = Pipeline::new(
            Services {
                extractor: Arc::new(FakeExtractor {
                    delay: Duration::from_millis(100),
                }),
                ..services(false, Arc::new(FakeRater::new(Duration::ZERO)))
            },
            cfg,
            ProgressReporter::disabled(),
        );

        let report = pipeline.run(documents, "jd").await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(report.records.len(), 6);
        assert_eq!(report.rated(), 0);
        let extracted = report.records.iter().filter(|r| r.profile.is_some()).count();
        assert_eq!(extracted, 3);
        for record in &report.records {
            assert!(record
                .failures
                .iter()
                .any(|f| f.failure == StageFailure::Timeout));
        }
        let never_extracted = report
            .records
            .iter()
            .filter(|r| r.profile.is_none())
            .all(|r| r.failed_at(Stage::Extracting));
        assert!(never_extracted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_parsing_skips_job_description_cleaning() {
        let mut cfg = config(true);
        cfg.concurrency = 1;
        cfg.run_deadline = Some(Duration::from_millis(150));
        let mut pipeline = Pipeline::new(
            Services {
                parser: Arc::new(SlowParser(Duration::from_millis(100))),
                ..services(false, Arc::new(FakeRater::new(Duration::ZERO)))
            },
            cfg,
            ProgressReporter::disabled(),
        );

        let report = pipeline
            .run(vec![txt("alice", "Alice\n5"), txt("bob", "Bob\n7")], "jd")
            .await
            .unwrap();

        assert!(!report.job_description_cleaned);
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| r.failed_at(Stage::Cleaning)));
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_with_nothing_done_fails_the_run() {
        let mut cfg = config(false);
        cfg.run_deadline = Some(Duration::ZERO);
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            cfg,
            ProgressReporter::disabled(),
        );

        let err = pipeline
            .run(vec![txt("alice", "Alice\n5")], "jd")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::DeadlineExceeded {
                stage: Stage::Parsing
            }
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Parsing));
    }

    #[tokio::test]
    async fn test_run_path_ingests_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Bob\n4").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Alice\n4").unwrap();
        let mut pipeline = Pipeline::new(
            services(false, Arc::new(FakeRater::new(Duration::ZERO))),
            config(false),
            ProgressReporter::disabled(),
        );

        let report = pipeline.run_path(dir.path(), "jd").await.unwrap();
        let names: Vec<&str> = report.records.iter().map(|r| r.file_name.as_str()).collect();

        // Equal scores keep ingestion order, which is file-name order.
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
