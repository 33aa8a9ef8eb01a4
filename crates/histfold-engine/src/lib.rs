pub mod config;
pub mod markers;
pub mod media;
pub mod persona;
pub mod redact;
pub mod serialize;
pub mod trace;

use anyhow::Result;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use histfold_contracts::events::EventWriter;
use histfold_contracts::history::Message;
use histfold_contracts::request::PromptRequest;

pub use config::PipelineConfig;
pub use markers::{inject_information, merge_information_markers};
pub use media::{
    aggregate_tagged_messages, apply_descriptions, attach_descriptions, fold_descriptions,
};
pub use persona::{normalize_influencer_name, normalize_last_user_message};
pub use redact::{redact_names, NameRedactor, USER_PLACEHOLDER};
pub use serialize::{serialize, Serializer};
pub use trace::{PipelineTrace, StageTrace};

#[derive(Debug, Clone, PartialEq)]
pub struct PromptBuild {
    pub prompt: String,
    /// History as handed to the serializer.
    pub history: Vec<Message>,
    /// SHA-256 of `prompt`, hex encoded.
    pub fingerprint: String,
}

type Stage<'a> = (&'static str, Box<dyn Fn(&[Message]) -> Vec<Message> + 'a>);

/// Runs the full history-to-prompt pipeline for one request.
///
/// Without an event writer the engine does no I/O and `build` cannot fail.
#[derive(Debug, Clone, Default)]
pub struct PromptEngine {
    config: PipelineConfig,
    events: Option<EventWriter>,
}

impl PromptEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn event_writer(&self) -> Option<&EventWriter> {
        self.events.as_ref()
    }

    pub fn build(&self, request: &PromptRequest) -> Result<PromptBuild> {
        self.run(request, None)
    }

    pub fn build_traced(&self, request: &PromptRequest) -> Result<(PromptBuild, PipelineTrace)> {
        let mut trace = PipelineTrace::default();
        let build = self.run(request, Some(&mut trace))?;
        Ok((build, trace))
    }

    fn stages<'a>(request: &'a PromptRequest) -> Vec<Stage<'a>> {
        vec![
            (
                "attach_descriptions",
                Box::new(move |history: &[Message]| {
                    attach_descriptions(history, &request.descriptions)
                }),
            ),
            ("aggregate_tags", Box::new(aggregate_tagged_messages)),
            ("fold_descriptions", Box::new(fold_descriptions)),
            (
                "normalize_persona_name",
                Box::new(move |history: &[Message]| match &request.persona {
                    Some(persona) => normalize_last_user_message(history, persona),
                    None => history.to_vec(),
                }),
            ),
            (
                "inject_information",
                Box::new(move |history: &[Message]| match request.information.as_deref() {
                    Some(info) => inject_information(history, info),
                    None => history.to_vec(),
                }),
            ),
        ]
    }

    fn run(
        &self,
        request: &PromptRequest,
        mut trace: Option<&mut PipelineTrace>,
    ) -> Result<PromptBuild> {
        self.emit(
            "prompt_build_started",
            json!({
                "messages": request.history.len(),
                "model_name": request.model_name,
            }),
        )?;

        let mut history = request.history.clone();
        for (stage, apply) in Self::stages(request) {
            let next = apply(&history);
            if let Some(trace) = trace.as_mut() {
                trace.record(stage, &history, &next);
            }
            self.emit(
                "stage_completed",
                json!({
                    "stage": stage,
                    "messages": next.len(),
                    "changed": next != history,
                }),
            )?;
            history = next;
        }

        let max_sentences = request
            .max_sentences_per_turn
            .or(self.config.max_sentences_per_turn);
        let prompt = Serializer::new(&request.model_name, &request.user_names)
            .max_sentences(max_sentences)
            .placeholder(&self.config.placeholder)
            .render(&history);
        let fingerprint = fingerprint(&prompt);

        self.emit(
            "prompt_built",
            json!({
                "fingerprint": fingerprint,
                "lines": prompt.lines().count(),
                "chars": prompt.chars().count(),
            }),
        )?;

        Ok(PromptBuild {
            prompt,
            history,
            fingerprint,
        })
    }

    fn emit(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(events) = &self.events {
            events.emit_json(event_type, payload)?;
        }
        Ok(())
    }
}

pub fn fingerprint(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}
