//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`Synthesizer`] to an in-memory
//! [`FakeTransport`] and a [`FakeTools`] runner that imitates rtmpdump,
//! swfrender and ffmpeg by writing the files they would produce.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use df_av::{ToolCommand, ToolOutput, ToolRegistry, ToolRunner};
use df_cache::ResourceCache;
use df_core::config::ToolsConfig;
use df_core::{Result, TalkManifest};
use df_fetch::{Fetcher, Response, Transport};
use df_pipeline::{StateObserver, SynthesisState, Synthesizer, Transition};

/// Serves a fixed set of URLs; everything else is a 404.
#[derive(Default)]
pub struct FakeTransport {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.bodies.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.lock().unwrap().get(url).cloned();
        Ok(match body {
            Some(body) => Response {
                status: 200,
                final_url: url.into(),
                body: Bytes::from(body),
            },
            None => Response {
                status: 404,
                final_url: url.into(),
                body: Bytes::new(),
            },
        })
    }
}

/// Records every invocation as `[program, args...]`.
pub struct FakeTools {
    invocations: Mutex<Vec<Vec<String>>>,
    /// Exit code of ffmpeg encodes (probes always print a banner).
    ffmpeg_exit: i32,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::with_ffmpeg_exit(0)
    }

    pub fn with_ffmpeg_exit(code: i32) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            ffmpeg_exit: code,
        }
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invocations of `program`, without the program name.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter(|inv| inv[0] == program)
            .map(|inv| inv[1..].to_vec())
            .collect()
    }
}

#[async_trait]
impl ToolRunner for FakeTools {
    async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        let program = cmd.tool_name();
        let args = cmd.get_args().to_vec();
        let mut inv = vec![program.clone()];
        inv.extend(args.iter().cloned());
        self.invocations.lock().unwrap().push(inv);

        let last = PathBuf::from(args.last().cloned().unwrap_or_default());
        match program.as_str() {
            "ffmpeg" if args.len() == 2 && args[0] == "-i" => Ok(ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "Stream #0:0: Video: h264, yuv420p, 640x360, 25 fps, 25 tbr, 1k tbn\n\
                         At least one output file must be specified"
                    .into(),
            }),
            "ffmpeg" if self.ffmpeg_exit != 0 => Ok(ToolOutput {
                code: Some(self.ffmpeg_exit),
                stdout: String::new(),
                stderr: "Unknown encoder 'libx264'".into(),
            }),
            _ => {
                std::fs::write(&last, format!("{program} output")).unwrap();
                Ok(ToolOutput {
                    code: Some(0),
                    ..Default::default()
                })
            }
        }
    }
}

/// A synthesizer over fakes, recording every state transition.
pub struct TestHarness {
    pub transport: Arc<FakeTransport>,
    pub tools: Arc<FakeTools>,
    pub transitions: Arc<Mutex<Vec<Transition>>>,
    pub synthesizer: Synthesizer,
}

impl TestHarness {
    pub fn new(transport: Arc<FakeTransport>, tools: Arc<FakeTools>) -> Self {
        Self::build(transport, tools, None)
    }

    pub fn with_cache(
        transport: Arc<FakeTransport>,
        tools: Arc<FakeTools>,
        cache: Arc<ResourceCache>,
    ) -> Self {
        Self::build(transport, tools, Some(cache))
    }

    fn build(
        transport: Arc<FakeTransport>,
        tools: Arc<FakeTools>,
        cache: Option<Arc<ResourceCache>>,
    ) -> Self {
        let mut fetcher = Fetcher::new(transport.clone()).with_parallelism(2);
        if let Some(cache) = cache {
            fetcher = fetcher.with_cache(cache);
        }
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let sink = transitions.clone();
        let synthesizer =
            Synthesizer::new(Arc::new(fetcher), ToolRegistry::discover(&ToolsConfig::default()))
                .with_runner(tools.clone())
                .with_observer(StateObserver::new(move |t| sink.lock().unwrap().push(t.clone())));
        Self {
            transport,
            tools,
            transitions,
            synthesizer,
        }
    }

    pub fn states(&self) -> Vec<SynthesisState> {
        self.transitions.lock().unwrap().iter().map(|t| t.state).collect()
    }

    /// Every scratch directory reported during the run.
    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .transitions
            .lock()
            .unwrap()
            .iter()
            .filter_map(|t| t.scratch.clone())
            .collect();
        dirs.dedup();
        dirs
    }
}

pub const SLIDE_1: &str = "http://talks.example/slides/s1.jpg";
pub const SLIDE_2: &str = "http://talks.example/slides/s2.jpg";
pub const SLIDE_3: &str = "http://talks.example/slides/s3.jpg";
pub const AUDIO: &str = "http://talks.example/audio/talk.mp3";
pub const VIDEO_KEY: &str = "rtmp://stream.example/app/mp4:talks/talk.mp4";

/// A three slide, ten second talk.
pub fn manifest() -> TalkManifest {
    TalkManifest::from_json(&format!(
        r#"{{
            "id": "talk",
            "title": "Rebuilding Talks",
            "author": "A. Speaker",
            "date": "2013-02-11",
            "duration": 10,
            "slides": ["{SLIDE_1}", "{SLIDE_2}", "{SLIDE_3}"],
            "timecodes": [0, 3, 7, 10],
            "video": {{"url": "rtmp://stream.example/app/", "path": "mp4:talks/talk.mp4"}}
        }}"#
    ))
    .unwrap()
}

/// A transport serving the three slides of [`manifest`].
pub fn slide_server() -> Arc<FakeTransport> {
    let transport = Arc::new(FakeTransport::default());
    transport.serve(SLIDE_1, b"slide one");
    transport.serve(SLIDE_2, b"slide two");
    transport.serve(SLIDE_3, b"slide three");
    transport
}
