//! In-memory collaborators for exercising the detection loop

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::analyzer::{AnalysisError, Analyzer};
use crate::camera::{CameraError, CameraSource, Frame};
use crate::detection::DetectionResponse;
use crate::speech::{SpeechEngine, SpeechError, Voice};

/// Camera whose start outcome and frame are fixed up front
pub struct FakeCamera {
    start_result: Result<(), CameraError>,
    frame: Option<Frame>,
    active: bool,
    probe: CameraProbe,
}

/// Counts start/stop calls on a `FakeCamera`
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl CameraProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            start_result: Ok(()),
            frame: Some(Frame::new(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9])),
            active: false,
            probe: CameraProbe::default(),
        }
    }

    pub fn failing(error: CameraError) -> Self {
        Self {
            start_result: Err(error),
            ..Self::new()
        }
    }

    pub fn without_frames() -> Self {
        Self {
            frame: None,
            ..Self::new()
        }
    }

    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl CameraSource for FakeCamera {
    async fn start(&mut self) -> Result<(), CameraError> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.start_result.clone()?;
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.active = false;
    }

    fn capture_frame(&mut self) -> Option<Frame> {
        if self.active {
            self.frame.clone()
        } else {
            None
        }
    }
}

/// Analyzer replaying queued outcomes, then repeating a default response
pub struct FakeAnalyzer {
    queued: Mutex<VecDeque<Result<DetectionResponse, String>>>,
    fallback: DetectionResponse,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeAnalyzer {
    pub fn new(fallback: DetectionResponse) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call waits this long on the tokio clock before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a failure for the next call
    pub fn fail_next(self) -> Self {
        self.queued
            .lock()
            .unwrap()
            .push_back(Err("service unavailable".to_string()));
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(&self, _frame: &Frame) -> Result<DetectionResponse, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.queued.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(body)) => Err(AnalysisError::Status { status: 503, body }),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// What a `FakeSpeech` engine was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak { text: String, voice: Option<String> },
    Cancel,
}

/// Shared record of speech calls
#[derive(Debug, Clone, Default)]
pub struct SpeechLog(Arc<Mutex<Vec<SpeechCall>>>);

impl SpeechLog {
    pub fn calls(&self) -> Vec<SpeechCall> {
        self.0.lock().unwrap().clone()
    }

    /// Texts passed to `speak`, in order
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SpeechCall::Speak { text, .. } => Some(text),
                SpeechCall::Cancel => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == SpeechCall::Cancel)
            .count()
    }

    fn push(&self, call: SpeechCall) {
        self.0.lock().unwrap().push(call);
    }
}

/// Speech engine where an utterance lasts until cancelled
pub struct FakeSpeech {
    voices: Vec<Voice>,
    speaking: bool,
    log: SpeechLog,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self::with_voices(Vec::new())
    }

    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            speaking: false,
            log: SpeechLog::default(),
        }
    }

    pub fn log(&self) -> SpeechLog {
        self.log.clone()
    }
}

impl SpeechEngine for FakeSpeech {
    fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<(), SpeechError> {
        self.log.push(SpeechCall::Speak {
            text: text.to_string(),
            voice: voice.map(|v| v.name.clone()),
        });
        self.speaking = true;
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.push(SpeechCall::Cancel);
        self.speaking = false;
    }

    fn is_speaking(&mut self) -> bool {
        self.speaking
    }
}
